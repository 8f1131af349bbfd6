//! Configuration for GeekMagic device tools.
//!
//! A TOML file of named devices plus global defaults, merged with
//! `GEEKMAGIC_`-prefixed environment variables, translated into
//! `geekmagic_core::DeviceConfig`. The file is only ever read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use geekmagic_core::DeviceConfig;

/// Environment variable prefix. Nested keys use `__`, e.g.
/// `GEEKMAGIC_DEFAULTS__TIMEOUT=5`.
pub const ENV_PREFIX: &str = "GEEKMAGIC_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no device named '{name}' in the config")]
    UnknownDevice { name: String },

    #[error("no device selected: pass --device or --host, or set default_device")]
    NoDevice,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Device used when none is named on the command line.
    pub default_device: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named devices.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Polling period in seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    /// Per-attempt timeout for queries and control calls, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Per-attempt timeout for uploads, in seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
            timeout: default_timeout(),
            upload_timeout: default_upload_timeout(),
        }
    }
}

fn default_update_interval() -> u64 {
    30
}
fn default_timeout() -> u64 {
    10
}
fn default_upload_timeout() -> u64 {
    20
}

/// A named device.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceEntry {
    /// Address, e.g. "192.168.1.50" or "http://frame.local".
    pub host: String,

    /// Override polling period (seconds).
    pub update_interval: Option<u64>,

    /// Override query timeout (seconds).
    pub timeout: Option<u64>,

    /// Override upload timeout (seconds).
    pub upload_timeout: Option<u64>,

    /// HTML render service for `send-html`.
    pub render_url: Option<String>,

    /// Defeat stale cached JSON on some firmware.
    #[serde(default)]
    pub cache_buster: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "geekmagic", "geekmagic").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("geekmagic");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the platform path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file is not an
/// error; the result is then defaults plus whatever the environment sets.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Parse a config from a TOML string, without the environment.
pub fn parse_config(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml_str))
        .extract()?;
    Ok(config)
}

// ── Translation to core config ──────────────────────────────────────

impl Config {
    /// Pick the device to operate on: the explicit name, else
    /// `default_device`, else the only configured device.
    pub fn resolve_device_name(&self, explicit: Option<&str>) -> Result<String, ConfigError> {
        if let Some(name) = explicit.or(self.default_device.as_deref()) {
            return Ok(name.to_owned());
        }
        let mut names = self.devices.keys();
        match (names.next(), names.next()) {
            (Some(only), None) => Ok(only.clone()),
            _ => Err(ConfigError::NoDevice),
        }
    }

    pub fn device(&self, name: &str) -> Result<&DeviceEntry, ConfigError> {
        self.devices
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDevice { name: name.into() })
    }

    /// Core config for a named device.
    pub fn device_config(&self, name: &str) -> Result<DeviceConfig, ConfigError> {
        entry_to_device_config(self.device(name)?, &self.defaults)
    }

    /// Core configs for every device, in name order.
    pub fn device_configs(&self) -> Result<Vec<(String, DeviceConfig)>, ConfigError> {
        self.devices
            .iter()
            .map(|(name, entry)| Ok((name.clone(), entry_to_device_config(entry, &self.defaults)?)))
            .collect()
    }

    /// Core config for an ad-hoc host given on the command line.
    pub fn host_config(&self, host: &str) -> Result<DeviceConfig, ConfigError> {
        let entry = DeviceEntry {
            host: host.to_owned(),
            ..DeviceEntry::default()
        };
        entry_to_device_config(&entry, &self.defaults)
    }

    /// Render the effective config as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Build a `DeviceConfig` from an entry, filling gaps from `defaults`.
pub fn entry_to_device_config(
    entry: &DeviceEntry,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    let host = entry.host.trim();
    if host.is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }

    let update_interval = positive_secs(
        "update_interval",
        entry.update_interval.unwrap_or(defaults.update_interval),
    )?;
    let timeout = positive_secs("timeout", entry.timeout.unwrap_or(defaults.timeout))?;
    let upload_timeout = positive_secs(
        "upload_timeout",
        entry.upload_timeout.unwrap_or(defaults.upload_timeout),
    )?;

    let render_url = entry
        .render_url
        .as_deref()
        .map(|raw| {
            raw.parse::<url::Url>().map_err(|_| ConfigError::Validation {
                field: "render_url".into(),
                reason: format!("invalid URL: {raw}"),
            })
        })
        .transpose()?;

    Ok(DeviceConfig {
        host: host.to_owned(),
        update_interval,
        timeout,
        upload_timeout,
        cache_buster: entry.cache_buster,
        render_url,
    })
}

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
default_device = "kitchen"

[defaults]
timeout = 5

[devices.kitchen]
host = "192.168.1.50"
update_interval = 60
render_url = "http://render.local/html"

[devices.office]
host = "http://frame.local:8080"
cache_buster = true
"#;

    #[test]
    fn defaults_fill_gaps() {
        let config = parse_config(SAMPLE).unwrap();
        let kitchen = config.device_config("kitchen").unwrap();
        assert_eq!(kitchen.update_interval, Duration::from_secs(60));
        assert_eq!(kitchen.timeout, Duration::from_secs(5));
        assert_eq!(kitchen.upload_timeout, Duration::from_secs(20));
        assert_eq!(
            kitchen.render_url.unwrap().as_str(),
            "http://render.local/html"
        );

        let office = config.device_config("office").unwrap();
        assert_eq!(office.update_interval, Duration::from_secs(30));
        assert!(office.cache_buster);
    }

    #[test]
    fn device_selection() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.resolve_device_name(None).unwrap(), "kitchen");
        assert_eq!(config.resolve_device_name(Some("office")).unwrap(), "office");

        let single = parse_config("[devices.den]\nhost = \"10.0.0.2\"").unwrap();
        assert_eq!(single.resolve_device_name(None).unwrap(), "den");

        let empty = Config::default();
        assert!(matches!(empty.resolve_device_name(None), Err(ConfigError::NoDevice)));
        assert!(matches!(
            empty.device("ghost"),
            Err(ConfigError::UnknownDevice { .. })
        ));
    }

    #[test]
    fn invalid_entries_are_rejected() {
        let config = parse_config(
            "[devices.a]\nhost = \" \"\n[devices.b]\nhost = \"x\"\nupdate_interval = 0\n\
             [devices.c]\nhost = \"y\"\nrender_url = \"not a url\"",
        )
        .unwrap();
        for (name, field) in [("a", "host"), ("b", "update_interval"), ("c", "render_url")] {
            match config.device_config(name) {
                Err(ConfigError::Validation { field: f, .. }) => assert_eq!(f, field),
                other => panic!("{name}: expected Validation, got {other:?}"),
            }
        }
        assert!(config.device_configs().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.devices.len(), 2);
        let names: Vec<String> = config
            .device_configs()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["kitchen", "office"]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.defaults.update_interval, 30);
        assert_eq!(config.host_config("10.0.0.9").unwrap().timeout, Duration::from_secs(10));
    }

    #[test]
    fn renders_back_to_toml() {
        let config = parse_config(SAMPLE).unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[devices.kitchen]"));
        assert!(text.contains("host = \"192.168.1.50\""));
    }
}
