// Transport layer: one `execute` capability, two implementations.
//
// `StrictTransport` wraps `reqwest`; `LenientTransport` speaks raw HTTP/1.1
// for endpoints where the firmware sends headers strict parsers refuse.
// Retry and status mapping live in the client, above both.

mod lenient;
mod strict;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::endpoint::{Method, Multipart, ResponseShape};
use crate::error::Error;

pub use lenient::{LenientTransport, ResponseParseError, parse_response};
pub use strict::StrictTransport;

/// A request ready to hit the wire.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// Endpoint label used to tag errors.
    pub endpoint: &'static str,
    pub method: Method,
    pub shape: ResponseShape,
    pub url: Url,
    pub body: Option<Multipart>,
}

/// Status and body, nothing else. Headers are consumed by the transport.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Execute one attempt of a prepared request.
///
/// Implementations only report transport-level failures; any HTTP status
/// comes back as a `RawResponse`.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &PreparedRequest,
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send;
}

/// Shared transport settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub user_agent: String,
    /// Connect timeout for the strict client. Per-attempt deadlines are
    /// enforced by the retry policy, not here.
    pub connect_timeout: Duration,
    /// Upper bound on a response body read by the lenient transport.
    pub max_body_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("geekmagic/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(5),
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| Error::Client(format!("failed to build HTTP client: {e}")))
    }
}
