//! Command dispatch: bridges CLI args -> coordinator calls -> output formatting.

pub mod batch;
pub mod config_cmd;
pub mod display;
pub mod images;
pub mod status;

use geekmagic_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a single-device command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    device: &str,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(device, coordinator, global),
        Command::Theme { theme } => display::theme(coordinator, &theme, global).await,
        Command::Brightness { value } => display::brightness(coordinator, value, global).await,
        Command::Images(args) => images::handle(coordinator, args, global).await,
        Command::Message {
            text,
            subject,
            style,
            timeout,
        } => display::message(coordinator, &text, &subject, &style, timeout, global).await,
        Command::Countdown {
            datetime,
            subject,
            timeout,
        } => display::countdown(coordinator, &datetime, &subject, timeout, global).await,
        Command::Note {
            text,
            rpm,
            force,
            timeout,
        } => display::note(coordinator, &text, rpm, force, timeout, global).await,
        // Handled before a coordinator is built
        Command::Watch(_)
        | Command::SendImage(_)
        | Command::SendHtml(_)
        | Command::Config(_)
        | Command::Completions(_) => unreachable!(),
    }
}
