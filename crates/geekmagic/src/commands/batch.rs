//! Multi-device delivery: send-image and send-html.

use std::path::Path;

use tabled::Tabled;
use url::Url;

use geekmagic_core::service::validate_image_filename;
use geekmagic_core::{DeliveryOutcome, DeviceConfig, DeviceRegistry, render_client};

use crate::cli::{GlobalOpts, SendHtmlArgs, SendImageArgs};
use crate::commands::images::file_name;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Result")]
    result: String,
}

/// Register every configured target concurrently. Unreachable devices
/// stay registered and names missing from the config are only kept as
/// ids, so both show up as failed outcome rows.
async fn registry_for(
    targets: Vec<(String, Option<DeviceConfig>)>,
) -> (DeviceRegistry, Vec<String>) {
    let ids = targets.iter().map(|(name, _)| name.clone()).collect();
    let configured = targets
        .into_iter()
        .filter_map(|(name, device)| Some((name, device?)));

    let registry = DeviceRegistry::new();
    for (name, result) in registry.register_all(configured).await {
        if let Err(e) = result {
            tracing::warn!(device = %name, error = %e, "device not reachable before delivery");
        }
    }
    (registry, ids)
}

fn report(outcomes: &[DeliveryOutcome], global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        outcomes,
        |o| {
            let error = o.result.as_ref().err().map(ToString::to_string);
            OutcomeRow {
                device: o.device.clone(),
                result: output::paint_outcome(error.as_deref(), color),
            }
        },
        |o| {
            let status = if o.is_ok() { "ok" } else { "failed" };
            format!("{}\t{status}", o.device)
        },
    );
    output::print_output(&out, global.quiet);

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        return Err(CliError::PartialDelivery {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}

/// Load the image from a local path, or download it when `source` is an
/// http(s) URL.
async fn load_image(source: &str) -> Result<(String, Vec<u8>), CliError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let url = source.parse::<Url>().map_err(|_| CliError::Validation {
            field: "source".into(),
            reason: format!("invalid URL: {source}"),
        })?;
        return Ok(geekmagic_core::fetch_image(&url).await?);
    }
    let path = Path::new(source);
    let filename = file_name(path)?;
    validate_image_filename(&filename)?;
    let data = tokio::fs::read(path).await?;
    Ok((filename, data))
}

pub async fn send_image(
    targets: Vec<(String, Option<DeviceConfig>)>,
    args: SendImageArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (filename, data) = load_image(&args.source).await?;

    let (registry, ids) = registry_for(targets).await;
    let outcomes = geekmagic_core::send_image(&registry, &ids, &data, &filename).await;
    registry.shutdown().await;
    report(&outcomes?, global)
}

pub async fn send_html(
    targets: Vec<(String, Option<DeviceConfig>)>,
    args: SendHtmlArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let render_url = match args.render_url.as_deref() {
        Some(raw) => raw.parse::<Url>().map_err(|_| CliError::Validation {
            field: "render-url".into(),
            reason: format!("invalid URL: {raw}"),
        })?,
        None => targets
            .iter()
            .find_map(|(_, device)| device.as_ref()?.render_url.clone())
            .ok_or_else(|| CliError::Validation {
                field: "render-url".into(),
                reason: "no render service configured; pass --render-url or set render_url".into(),
            })?,
    };
    let render = render_client(render_url)?;
    let html = tokio::fs::read_to_string(&args.file).await?;

    let (registry, ids) = registry_for(targets).await;
    let outcomes = geekmagic_core::send_html(&registry, &ids, &html, &render).await;
    registry.shutdown().await;
    report(&outcomes?, global)
}
