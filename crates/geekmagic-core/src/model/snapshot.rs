// ── Device snapshot ──
//
// The coordinator's cached, last-known-good view of one device. A poll
// cycle never clears a field: whatever the device did not answer this
// time keeps its previous value.

use chrono::{DateTime, Utc};
use serde::Serialize;

use geekmagic_api::DeviceStatus;

use super::theme::{Theme, find_by_id};
use super::variant::DeviceVariant;

/// Cached device state. Readers get it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub theme: Option<i64>,
    pub brightness: Option<i64>,
    pub model: Option<String>,
    pub free_space_bytes: Option<u64>,
    /// Files in `/image`, in listing order.
    pub images: Vec<String>,
    /// Files in `/gif`. Only listed on variants that have the directory.
    pub small_images: Vec<String>,
    pub variant: DeviceVariant,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DeviceSnapshot {
    /// Overlay the fields present in `status`.
    pub fn merge_status(&mut self, status: DeviceStatus) {
        if let Some(theme) = status.theme {
            self.theme = Some(theme);
        }
        if let Some(brightness) = status.brightness {
            self.brightness = Some(brightness);
        }
        if status.model.is_some() {
            self.model = status.model;
        }
        self.variant = DeviceVariant::from_model(self.model.as_deref());
    }

    pub fn is_aydarik(&self) -> bool {
        self.variant.is_aydarik()
    }

    pub fn supports_small_images(&self) -> bool {
        self.variant.supports_small_images()
    }

    /// Free flash in kilobytes, rounded to two decimals.
    #[allow(clippy::cast_precision_loss)]
    pub fn free_space_kb(&self) -> Option<f64> {
        self.free_space_bytes
            .map(|bytes| (bytes as f64 / 1024.0 * 100.0).round() / 100.0)
    }

    /// The active theme's entry in this device's catalogue.
    pub fn current_theme(&self) -> Option<&'static Theme> {
        self.theme
            .and_then(|id| find_by_id(self.variant.theme_catalogue(), id))
    }

    pub fn current_theme_name(&self) -> Option<&'static str> {
        self.current_theme().map(|t| t.name)
    }
}
