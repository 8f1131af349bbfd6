// ── Domain model ──

pub mod snapshot;
pub mod theme;
pub mod variant;

pub use snapshot::DeviceSnapshot;
pub use theme::{CUSTOM_THEMES, SMALLTV_THEMES, Theme};
pub use variant::DeviceVariant;
