// ── Runtime device configuration ──
//
// These types describe *how* to reach one device and how often to poll
// it. They never touch disk: the CLI (via geekmagic-config) builds a
// `DeviceConfig` and hands it in.

use std::time::Duration;

use url::Url;

use geekmagic_api::{ClientOptions, DeviceClient, RenderClient, TransportConfig};

use crate::error::CoreError;

/// Default polling period.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for a single device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device address, e.g. `192.168.1.50` or `http://frame.local`.
    pub host: String,
    /// Time between polling cycles.
    pub update_interval: Duration,
    /// Per-attempt deadline for status queries and control calls.
    pub timeout: Duration,
    /// Per-attempt deadline for uploads.
    pub upload_timeout: Duration,
    /// Append a cache-busting query pair to status queries.
    pub cache_buster: bool,
    /// HTML render service used by `send_html`.
    pub render_url: Option<Url>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            timeout: Duration::from_secs(10),
            upload_timeout: Duration::from_secs(20),
            cache_buster: false,
            render_url: None,
        }
    }
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Client options derived from this config.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            cache_buster: self.cache_buster,
            ..ClientOptions::default()
        }
        .with_timeouts(self.timeout, self.upload_timeout)
    }

    /// Build a device client for this config.
    pub fn build_client(&self) -> Result<DeviceClient, CoreError> {
        if self.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "device host is empty".into(),
            });
        }
        Ok(DeviceClient::new(&self.host, self.client_options())?)
    }

    /// Build a render client, if a render service is configured.
    pub fn build_render_client(&self) -> Result<Option<RenderClient>, CoreError> {
        self.render_url.clone().map(render_client).transpose()
    }
}

/// Build a client for the HTML render service at `url`.
pub fn render_client(url: Url) -> Result<RenderClient, CoreError> {
    let http = TransportConfig::default().build_client()?;
    Ok(RenderClient::new(http, url))
}
