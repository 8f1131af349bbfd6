//! Polling coordinator and device model on top of `geekmagic-api`.
//!
//! - **[`Coordinator`]**: polls one device on an interval and keeps a
//!   last-known-good [`DeviceSnapshot`]. Concurrent refreshes coalesce; a
//!   device that was reachable once stays [`CoordinatorState::Ready`]
//!   through outages. Snapshot and state are published on `watch` channels.
//!
//! - **[`DeviceRegistry`]**: host-owned map of coordinators (`DashMap`),
//!   with first-refresh and polling lifecycle on register/remove.
//!
//! - **Batch services** ([`service`]): push an image, or rendered HTML, to
//!   several devices concurrently with per-device outcomes.
//!
//! - **Domain model** ([`model`]): snapshot, firmware variant detection and
//!   theme catalogues.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod registry;
pub mod service;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_UPDATE_INTERVAL, DeviceConfig, render_client};
pub use coordinator::{Coordinator, CoordinatorState};
pub use error::CoreError;
pub use model::{CUSTOM_THEMES, DeviceSnapshot, DeviceVariant, SMALLTV_THEMES, Theme};
pub use registry::{DeviceHandle, DeviceRegistry};
pub use service::{DeliveryOutcome, UPLOAD_FILENAME, fetch_image, send_html, send_image};

// Client-level types callers need alongside the coordinator.
pub use geekmagic_api::{ImageDirectory, RenderClient};
