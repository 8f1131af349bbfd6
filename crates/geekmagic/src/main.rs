mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use geekmagic_config::{Config, ConfigError};
use geekmagic_core::{Coordinator, DeviceConfig};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "geekmagic", &mut std::io::stdout());
            Ok(())
        }

        Command::Config(args) => {
            let config = load_config(&cli.global)?;
            commands::config_cmd::handle(args, &config, &cli.global)
        }

        // Multi-device commands own a registry
        Command::Watch(args) => {
            let config = load_config(&cli.global)?;
            let targets = resolve_targets(&config, &cli.global)?;
            commands::status::watch(targets, args, &cli.global).await
        }
        Command::SendImage(args) => {
            let config = load_config(&cli.global)?;
            let targets = delivery_targets(&config, &cli.global, &args.targets)?;
            commands::batch::send_image(targets, args, &cli.global).await
        }
        Command::SendHtml(args) => {
            let config = load_config(&cli.global)?;
            let targets = delivery_targets(&config, &cli.global, &args.targets)?;
            commands::batch::send_html(targets, args, &cli.global).await
        }

        // Everything else talks to one device
        cmd => {
            let config = load_config(&cli.global)?;
            let (name, device) = resolve_single(&config, &cli.global)?;
            let coordinator = connect(&device).await?;

            tracing::debug!(device = %name, command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &name, &coordinator, &cli.global).await;
            coordinator.shutdown().await;
            result
        }
    }
}

fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let config = match &global.config {
        Some(path) => geekmagic_config::load_config_from(path)?,
        None => geekmagic_config::load_config()?,
    };
    Ok(config)
}

/// The device a single-device command acts on: `--host` wins over
/// `--device`, which wins over the config's default.
fn resolve_single(
    config: &Config,
    global: &GlobalOpts,
) -> Result<(String, DeviceConfig), CliError> {
    if let Some(host) = global.host.as_deref() {
        return Ok((host.to_owned(), config.host_config(host)?));
    }
    let name = config.resolve_device_name(global.device.as_deref())?;
    let device = config.device_config(&name)?;
    Ok((name, device))
}

/// Devices a multi-device command acts on: the one picked by
/// `--host`/`--device`, else every configured device.
fn resolve_targets(
    config: &Config,
    global: &GlobalOpts,
) -> Result<Vec<(String, DeviceConfig)>, CliError> {
    if global.host.is_some() || global.device.is_some() {
        return Ok(vec![resolve_single(config, global)?]);
    }
    let all = config.device_configs()?;
    if all.is_empty() {
        return Err(CliError::NoDevice {
            path: geekmagic_config::config_path().display().to_string(),
        });
    }
    Ok(all)
}

/// Delivery targets: explicit `--to` names, else [`resolve_targets`].
/// Explicit names missing from the config are kept without a config and
/// reported as failed deliveries instead of aborting the batch.
fn delivery_targets(
    config: &Config,
    global: &GlobalOpts,
    explicit: &[String],
) -> Result<Vec<(String, Option<DeviceConfig>)>, CliError> {
    if explicit.is_empty() {
        let targets = resolve_targets(config, global)?;
        return Ok(targets.into_iter().map(|(name, device)| (name, Some(device))).collect());
    }
    explicit
        .iter()
        .map(|name| match config.device_config(name) {
            Ok(device) => Ok((name.clone(), Some(device))),
            Err(ConfigError::UnknownDevice { .. }) => Ok((name.clone(), None)),
            Err(e) => Err(e.into()),
        })
        .collect()
}

/// Build a coordinator and load the first snapshot, so firmware-specific
/// commands know which variant they are talking to.
async fn connect(device: &DeviceConfig) -> Result<Coordinator, CliError> {
    let client = device.build_client()?;
    let coordinator = Coordinator::new(client, device);
    coordinator.refresh().await?;
    Ok(coordinator)
}
