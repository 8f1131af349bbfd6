// ── Firmware variant detection ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::theme::{CUSTOM_THEMES, SMALLTV_THEMES, Theme};

/// Which firmware a device runs, derived from the `v.json` model string.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeviceVariant {
    /// Stock SmallTV firmware (`SmallTV-Ultra`, `SmallTV-Pro`, ...).
    SmallTv,
    /// Aydarik's custom firmware with message, countdown and note screens.
    Aydarik,
    #[default]
    Unknown,
}

impl DeviceVariant {
    pub fn from_model(model: Option<&str>) -> Self {
        let Some(model) = model.map(str::trim) else {
            return Self::Unknown;
        };
        if model.starts_with("SmallTV") {
            Self::SmallTv
        } else if model
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("aydarik"))
        {
            Self::Aydarik
        } else {
            Self::Unknown
        }
    }

    pub fn is_aydarik(self) -> bool {
        matches!(self, Self::Aydarik)
    }

    /// Only stock SmallTV firmware has the `/gif` directory.
    pub fn supports_small_images(self) -> bool {
        matches!(self, Self::SmallTv)
    }

    pub fn theme_catalogue(self) -> &'static [Theme] {
        match self {
            Self::SmallTv => SMALLTV_THEMES,
            Self::Aydarik | Self::Unknown => CUSTOM_THEMES,
        }
    }
}
