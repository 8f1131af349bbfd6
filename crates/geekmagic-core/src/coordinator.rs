// ── Update coordinator ──
//
// Polls one device on an interval and keeps a last-known-good snapshot.
// Concurrent refresh requests coalesce onto the one in flight; a device
// that has been reachable once stays `Ready` through later outages and
// keeps serving its stale snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use geekmagic_api::{DeviceClient, ImageDirectory};

use crate::config::DeviceConfig;
use crate::error::CoreError;
use crate::model::theme::{Theme, find_by_name};
use crate::model::{DeviceSnapshot, DeviceVariant};

// ── CoordinatorState ─────────────────────────────────────────────

/// Availability as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorState {
    /// Constructed, never polled.
    Uninitialized,
    /// First poll (or a poll after an outage) in progress.
    Polling,
    /// At least one poll succeeded; the snapshot is usable.
    Ready,
    /// Never reached the device.
    Unavailable,
}

// ── Coordinator ──────────────────────────────────────────────────

/// Polling coordinator for one device.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    client: DeviceClient,
    snapshot: watch::Sender<Arc<DeviceSnapshot>>,
    state: watch::Sender<CoordinatorState>,
    update_interval: watch::Sender<Duration>,
    /// Held for the duration of a refresh; waiters read the outcome it left.
    refresh_slot: Mutex<RefreshSlot>,
    /// Mirror of `RefreshSlot::completed`, readable without the lock.
    completed: AtomicU64,
    /// Token for the current polling task, replaced on restart.
    cancel: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct RefreshSlot {
    completed: u64,
    outcome: Result<(), CoreError>,
}

impl Coordinator {
    /// Create a coordinator with an empty snapshot. Does NOT poll; call
    /// [`refresh()`](Self::refresh) or [`start()`](Self::start).
    pub fn new(client: DeviceClient, config: &DeviceConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(DeviceSnapshot::default()));
        let (state, _) = watch::channel(CoordinatorState::Uninitialized);
        let (update_interval, _) = watch::channel(config.update_interval);

        Self {
            inner: Arc::new(CoordinatorInner {
                client,
                snapshot,
                state,
                update_interval,
                refresh_slot: Mutex::new(RefreshSlot {
                    completed: 0,
                    outcome: Ok(()),
                }),
                completed: AtomicU64::new(0),
                cancel: Mutex::new(CancellationToken::new()),
                task: Mutex::new(None),
            }),
        }
    }

    // ── Observation ──────────────────────────────────────────────

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<DeviceSnapshot> {
        Arc::clone(&self.inner.snapshot.borrow())
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DeviceSnapshot>> {
        self.inner.snapshot.subscribe()
    }

    pub fn state(&self) -> CoordinatorState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    pub fn is_aydarik(&self) -> bool {
        self.snapshot().is_aydarik()
    }

    pub fn supports_small_images(&self) -> bool {
        self.snapshot().supports_small_images()
    }

    pub fn variant(&self) -> DeviceVariant {
        self.snapshot().variant
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Poll the device and merge the result into the snapshot.
    ///
    /// A call made while another refresh is in flight waits for it and
    /// returns its outcome instead of polling again.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let seen = self.inner.completed.load(Ordering::Acquire);
        let mut slot = self.inner.refresh_slot.lock().await;
        if slot.completed != seen {
            debug!("joined in-flight refresh");
            return slot.outcome.clone();
        }

        let outcome = self.poll_once().await;
        slot.completed += 1;
        slot.outcome = outcome.clone();
        self.inner.completed.store(slot.completed, Ordering::Release);
        outcome
    }

    /// Refresh right away, typically after a state-changing command.
    pub async fn refresh_now(&self) -> Result<(), CoreError> {
        self.refresh().await
    }

    async fn poll_once(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        let client = &inner.client;
        let previous = self.state();
        if previous != CoordinatorState::Ready {
            inner.state.send_replace(CoordinatorState::Polling);
        }

        let status = match client.get_status().await {
            Ok(status) => status,
            Err(e) => return self.absorb_unreachable(previous, &CoreError::from(e)),
        };

        let mut next = DeviceSnapshot::clone(&inner.snapshot.borrow());
        next.merge_status(status);

        match client.get_free_space().await {
            Ok(Some(free)) => next.free_space_bytes = Some(free),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "free space unavailable, keeping last value"),
        }
        match client.try_list_images(ImageDirectory::Image).await {
            Ok(files) => next.images = files,
            Err(e) => warn!(error = %e, "image list unavailable, keeping last value"),
        }
        if next.supports_small_images() {
            match client.try_list_images(ImageDirectory::Gif).await {
                Ok(files) => next.small_images = files,
                Err(e) => warn!(error = %e, "small image list unavailable, keeping last value"),
            }
        }
        next.last_updated = Some(Utc::now());

        inner.snapshot.send_replace(Arc::new(next));
        if previous != CoordinatorState::Ready {
            info!(device = %client.base_url(), "device available");
        }
        inner.state.send_replace(CoordinatorState::Ready);
        Ok(())
    }

    fn absorb_unreachable(
        &self,
        previous: CoordinatorState,
        err: &CoreError,
    ) -> Result<(), CoreError> {
        let device = self.inner.client.base_url().to_string();
        if previous == CoordinatorState::Ready {
            warn!(%device, error = %err, "refresh failed, serving last known snapshot");
            return Ok(());
        }
        if previous != CoordinatorState::Unavailable {
            info!(%device, error = %err, "device unavailable");
        }
        self.inner
            .state
            .send_replace(CoordinatorState::Unavailable);
        Err(CoreError::AggregateUnavailable {
            device,
            reason: err.to_string(),
        })
    }

    // ── Polling lifecycle ────────────────────────────────────────

    pub fn update_interval(&self) -> Duration {
        *self.inner.update_interval.borrow()
    }

    /// Change the polling period. Takes effect when the next wait starts;
    /// the current wait and any in-flight refresh are untouched.
    pub fn set_update_interval(&self, interval: Duration) {
        self.inner.update_interval.send_replace(interval);
        debug!(?interval, "update interval changed");
    }

    /// Spawn the background polling task. No-op if it is already running.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let cancel = CancellationToken::new();
        *self.inner.cancel.lock().await = cancel.clone();
        *task = Some(tokio::spawn(poll_task(self.clone(), cancel)));
        debug!(device = %self.inner.client.base_url(), "polling started");
    }

    /// Stop the polling task and wait for it to exit. An in-flight
    /// refresh started by the task is abandoned.
    pub async fn shutdown(&self) {
        self.inner.cancel.lock().await.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        debug!(device = %self.inner.client.base_url(), "polling stopped");
    }

    pub async fn is_polling(&self) -> bool {
        self.inner
            .task
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    // ── Pass-through operations ──────────────────────────────────

    pub async fn set_theme(&self, theme: i64) -> Result<(), CoreError> {
        Ok(self.inner.client.set_theme(theme).await?)
    }

    /// Select a theme by catalogue name for the current firmware variant.
    pub async fn select_theme(&self, name: &str) -> Result<&'static Theme, CoreError> {
        let variant = self.variant();
        let catalogue = variant.theme_catalogue();
        let Some(theme) = find_by_name(catalogue, name) else {
            let known: Vec<&str> = catalogue.iter().map(|t| t.name).collect();
            return Err(CoreError::ValidationFailed {
                message: format!(
                    "unknown theme {name:?} for {variant} firmware (expected one of: {})",
                    known.join(", ")
                ),
            });
        };
        self.set_theme(theme.id).await?;
        Ok(theme)
    }

    /// Set backlight brightness, `0..=100`.
    pub async fn set_brightness(&self, value: i64) -> Result<(), CoreError> {
        let level = u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or_else(|| CoreError::ValidationFailed {
                message: format!("brightness {value} out of range 0-100"),
            })?;
        Ok(self.inner.client.set_brightness(level).await?)
    }

    pub async fn set_image(
        &self,
        filename: &str,
        timeout: Option<u32>,
        force_theme_switch: bool,
    ) -> Result<(), CoreError> {
        Ok(self
            .inner
            .client
            .set_image(filename, timeout, force_theme_switch)
            .await?)
    }

    pub async fn set_small_image(&self, filename: &str) -> Result<(), CoreError> {
        if !self.supports_small_images() {
            return Err(unsupported("set_small_image", "SmallTV firmware"));
        }
        Ok(self.inner.client.set_small_image(filename).await?)
    }

    pub async fn delete_image(&self, filename: &str) -> Result<(), CoreError> {
        Ok(self.inner.client.delete_image(filename).await?)
    }

    pub async fn set_message(
        &self,
        text: &str,
        subject: &str,
        style: &str,
        timeout: Option<u32>,
    ) -> Result<(), CoreError> {
        self.require_aydarik("set_message")?;
        Ok(self
            .inner
            .client
            .set_message(text, subject, style, timeout)
            .await?)
    }

    pub async fn set_countdown(
        &self,
        datetime: &str,
        subject: &str,
        timeout: Option<u32>,
    ) -> Result<(), CoreError> {
        self.require_aydarik("set_countdown")?;
        Ok(self
            .inner
            .client
            .set_countdown(datetime, subject, timeout)
            .await?)
    }

    pub async fn set_note(
        &self,
        text: &str,
        rpm: Option<u32>,
        force: bool,
        timeout: Option<u32>,
    ) -> Result<(), CoreError> {
        self.require_aydarik("set_note")?;
        Ok(self.inner.client.set_note(text, rpm, force, timeout).await?)
    }

    pub async fn upload_file(&self, data: &[u8], filename: &str) -> Result<(), CoreError> {
        Ok(self.inner.client.upload_file(data, filename).await?)
    }

    fn require_aydarik(&self, operation: &str) -> Result<(), CoreError> {
        if self.is_aydarik() {
            Ok(())
        } else {
            Err(unsupported(operation, "aydarik firmware"))
        }
    }
}

fn unsupported(operation: &str, required: &str) -> CoreError {
    CoreError::Unsupported {
        operation: operation.to_owned(),
        required: required.to_owned(),
    }
}

/// Refresh on the configured interval until cancelled. The period is
/// re-read before every wait.
async fn poll_task(coordinator: Coordinator, cancel: CancellationToken) {
    loop {
        let period = coordinator.update_interval();
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(period) => {}
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = coordinator.refresh() => {
                if let Err(e) = result {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
