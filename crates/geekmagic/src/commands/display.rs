//! Theme, brightness and custom-firmware screen handlers.
//!
//! Every successful control call is followed by an immediate refresh so
//! the confirmation reflects what the device reports back.

use geekmagic_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

async fn settle(coordinator: &Coordinator) {
    if let Err(e) = coordinator.refresh_now().await {
        tracing::debug!(error = %e, "refresh after control call failed");
    }
}

pub async fn theme(
    coordinator: &Coordinator,
    theme: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let label = match theme.trim().parse::<i64>() {
        Ok(id) => {
            coordinator.set_theme(id).await?;
            id.to_string()
        }
        Err(_) => {
            let selected = coordinator.select_theme(theme).await?;
            format!("{} ({})", selected.id, selected.name)
        }
    };
    settle(coordinator).await;
    output::confirm(&format!("Theme set to {label}"), global.quiet);
    Ok(())
}

pub async fn brightness(
    coordinator: &Coordinator,
    value: i64,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.set_brightness(value).await?;
    settle(coordinator).await;
    let reported = output::or_dash(coordinator.snapshot().brightness);
    output::confirm(
        &format!("Brightness set to {value} (device reports {reported})"),
        global.quiet,
    );
    Ok(())
}

pub async fn message(
    coordinator: &Coordinator,
    text: &str,
    subject: &str,
    style: &str,
    timeout: Option<u32>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.set_message(text, subject, style, timeout).await?;
    settle(coordinator).await;
    output::confirm("Message shown", global.quiet);
    Ok(())
}

pub async fn countdown(
    coordinator: &Coordinator,
    datetime: &str,
    subject: &str,
    timeout: Option<u32>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.set_countdown(datetime, subject, timeout).await?;
    settle(coordinator).await;
    output::confirm(&format!("Counting down to {datetime}"), global.quiet);
    Ok(())
}

pub async fn note(
    coordinator: &Coordinator,
    text: &str,
    rpm: Option<u32>,
    force: bool,
    timeout: Option<u32>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.set_note(text, rpm, force, timeout).await?;
    settle(coordinator).await;
    output::confirm("Note shown", global.quiet);
    Ok(())
}
