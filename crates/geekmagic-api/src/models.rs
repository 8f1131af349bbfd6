// Wire types for the device's JSON endpoints.
//
// Firmware revisions disagree on number encoding: some send `{"brt":"42"}`,
// others `{"brt":42}`. `loose_i64` accepts both.

use serde::{Deserialize, Deserializer, Serialize};

/// `GET /app.json`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ThemeResponse {
    #[serde(default, deserialize_with = "loose_i64")]
    pub theme: Option<i64>,
}

/// `GET /brt.json`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BrightnessResponse {
    #[serde(default, deserialize_with = "loose_i64")]
    pub brt: Option<i64>,
}

/// `GET /v.json`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VersionResponse {
    #[serde(default)]
    pub m: Option<String>,
}

/// `GET /space.json`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SpaceResponse {
    #[serde(default, deserialize_with = "loose_i64")]
    pub free: Option<i64>,
}

/// Merged result of the three status endpoints.
///
/// A `None` field means the device did not provide it this time (404 or a
/// failed fetch); callers keep whatever value they had before.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub theme: Option<i64>,
    pub brightness: Option<i64>,
    pub model: Option<String>,
}

fn loose_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Int(v)) => Some(v),
        #[allow(clippy::cast_possible_truncation)]
        Some(Loose::Float(v)) => Some(v as i64),
        Some(Loose::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
