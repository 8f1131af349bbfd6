//! Status and watch handlers.

use std::sync::Arc;

use bytesize::ByteSize;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use geekmagic_core::{
    Coordinator, CoordinatorState, DeviceConfig, DeviceRegistry, DeviceSnapshot,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

// ── View ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StatusView {
    device: String,
    state: CoordinatorState,
    #[serde(flatten)]
    snapshot: DeviceSnapshot,
    theme_name: Option<&'static str>,
    free_space_kb: Option<f64>,
}

impl StatusView {
    fn new(device: &str, state: CoordinatorState, snapshot: &DeviceSnapshot) -> Self {
        Self {
            device: device.to_owned(),
            state,
            theme_name: snapshot.current_theme_name(),
            free_space_kb: snapshot.free_space_kb(),
            snapshot: snapshot.clone(),
        }
    }
}

fn theme_label(snapshot: &DeviceSnapshot) -> String {
    match (snapshot.theme, snapshot.current_theme_name()) {
        (Some(id), Some(name)) => format!("{id} ({name})"),
        (Some(id), None) => id.to_string(),
        (None, _) => "-".into(),
    }
}

fn free_space_label(snapshot: &DeviceSnapshot) -> String {
    output::or_dash(snapshot.free_space_bytes.map(ByteSize))
}

fn local_time(at: Option<DateTime<Utc>>) -> String {
    output::or_dash(at.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")))
}

fn detail(view: &StatusView, color: bool) -> String {
    let s = &view.snapshot;
    let mut pairs = vec![
        ("Device", view.device.clone()),
        ("State", output::paint_state(view.state, color)),
        ("Model", output::or_dash(s.model.as_deref())),
        ("Firmware", s.variant.to_string()),
        ("Theme", theme_label(s)),
        ("Brightness", output::or_dash(s.brightness)),
        ("Free space", free_space_label(s)),
        ("Images", s.images.len().to_string()),
    ];
    if s.supports_small_images() {
        pairs.push(("Small images", s.small_images.len().to_string()));
    }
    pairs.push(("Updated", local_time(s.last_updated)));
    output::detail_block(&pairs)
}

/// One line per change while watching.
fn summary_line(view: &StatusView, color: bool) -> String {
    let s = &view.snapshot;
    format!(
        "{}  {}  {}  theme={}  brightness={}  free={}",
        local_time(s.last_updated),
        view.device,
        output::paint_state(view.state, color),
        theme_label(s),
        output::or_dash(s.brightness),
        free_space_label(s),
    )
}

// ── Handlers ─────────────────────────────────────────────────────────

pub fn handle(
    device: &str,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = coordinator.snapshot();
    let view = StatusView::new(device, coordinator.state(), &snapshot);
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, color),
        |v| output::or_dash(v.snapshot.theme),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Register every target, then print each snapshot change until Ctrl-C.
pub async fn watch(
    targets: Vec<(String, DeviceConfig)>,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let registry = DeviceRegistry::new();
    let color = output::should_color(&global.color);

    let devices = targets.into_iter().map(|(name, mut device)| {
        if let Some(interval) = args.interval {
            device.update_interval = interval;
        }
        (name, device)
    });
    let mut printers = Vec::new();
    for (name, result) in registry.register_all(devices).await {
        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(device = %name, error = %e, "device not reachable yet");
                registry.require(&name)?
            }
        };
        printers.push(tokio::spawn(print_changes(
            name,
            handle.coordinator,
            global.output.clone(),
            color,
        )));
    }

    output::confirm(
        &format!("Watching {} device(s), Ctrl-C to stop", registry.len()),
        global.quiet,
    );
    tokio::signal::ctrl_c().await?;

    for printer in printers {
        printer.abort();
    }
    registry.shutdown().await;
    Ok(())
}

async fn print_changes(
    name: String,
    coordinator: Coordinator,
    format: OutputFormat,
    color: bool,
) {
    let mut snapshots = coordinator.subscribe();
    let mut states = coordinator.subscribe_state();
    let mut last: Option<(CoordinatorState, Arc<DeviceSnapshot>)> = None;

    loop {
        let state = *states.borrow_and_update();
        let snapshot = Arc::clone(&snapshots.borrow_and_update());
        let changed = last
            .as_ref()
            .is_none_or(|(s, snap)| *s != state || **snap != *snapshot);
        if changed {
            let view = StatusView::new(&name, state, &snapshot);
            let line = output::render_single(
                &format,
                &view,
                |v| summary_line(v, color),
                |v| format!("{}\t{}", v.device, v.state),
            );
            output::print_output(&line, false);
            last = Some((state, snapshot));
        }

        tokio::select! {
            res = snapshots.changed() => {
                if res.is_err() {
                    break;
                }
            }
            res = states.changed() => {
                if res.is_err() {
                    break;
                }
            }
        }
    }
}
