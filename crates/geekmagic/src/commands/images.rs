//! Image album handlers.

use std::path::Path;

use tabled::Tabled;

use geekmagic_core::{Coordinator, CoreError};

use crate::cli::{GlobalOpts, ImagesArgs, ImagesCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "File")]
    name: String,
}

pub async fn handle(
    coordinator: &Coordinator,
    args: ImagesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ImagesCommand::List { small } => {
            if small && !coordinator.supports_small_images() {
                return Err(CoreError::Unsupported {
                    operation: "images list --small".into(),
                    required: "SmallTV firmware".into(),
                }
                .into());
            }
            let snapshot = coordinator.snapshot();
            let files = if small {
                &snapshot.small_images
            } else {
                &snapshot.images
            };
            let out = output::render_list(
                &global.output,
                files,
                |name| ImageRow { name: name.clone() },
                Clone::clone,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ImagesCommand::Set {
            file,
            timeout,
            no_switch,
        } => {
            coordinator.set_image(&file, timeout, !no_switch).await?;
            output::confirm(&format!("Showing {file}"), global.quiet);
            Ok(())
        }

        ImagesCommand::Small { file } => {
            coordinator.set_small_image(&file).await?;
            output::confirm(&format!("Small image set to {file}"), global.quiet);
            Ok(())
        }

        ImagesCommand::Delete { file } => {
            coordinator.delete_image(&file).await?;
            if let Err(e) = coordinator.refresh_now().await {
                tracing::debug!(error = %e, "refresh after delete failed");
            }
            output::confirm(&format!("Deleted {file}"), global.quiet);
            Ok(())
        }

        ImagesCommand::Upload { path, name } => {
            let name = match name {
                Some(name) => name,
                None => file_name(&path)?,
            };
            let data = tokio::fs::read(&path).await?;
            coordinator.upload_file(&data, &name).await?;
            if let Err(e) = coordinator.refresh_now().await {
                tracing::debug!(error = %e, "refresh after upload failed");
            }
            output::confirm(
                &format!("Uploaded {} as {name} ({} bytes)", path.display(), data.len()),
                global.quiet,
            );
            Ok(())
        }
    }
}

/// Final path component as UTF-8.
pub fn file_name(path: &Path) -> Result<String, CliError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| CliError::Validation {
            field: "path".into(),
            reason: format!("{} has no file name", path.display()),
        })
}
