// ── Core error types ──
//
// User-facing errors from geekmagic-core. Consumers never see raw HTTP
// statuses or socket errors; `From<geekmagic_api::Error>` translates them.
// Every payload is a plain string so the type is `Clone`: a coalesced
// refresh hands the same outcome to every waiter.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Device request timed out after {timeout_secs}s ({endpoint})")]
    Timeout { endpoint: String, timeout_secs: u64 },

    /// The first refresh of a device failed; there is no snapshot to serve.
    #[error("Device {device} is unavailable: {reason}")]
    AggregateUnavailable { device: String, reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Not found on device: {endpoint}")]
    NotFound { endpoint: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} (requires {required})")]
    Unsupported { operation: String, required: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Device endpoint that failed, e.g. `set` or `doUpload`.
        endpoint: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<geekmagic_api::Error> for CoreError {
    fn from(err: geekmagic_api::Error) -> Self {
        use geekmagic_api::Error as ApiError;

        match err {
            ApiError::NotFound { endpoint } => CoreError::NotFound { endpoint },
            ApiError::Timeout {
                endpoint,
                timeout_secs,
            } => CoreError::Timeout {
                endpoint,
                timeout_secs,
            },
            ApiError::Transport { endpoint, source } => CoreError::Api {
                message: format!("{endpoint}: {source}"),
                endpoint: Some(endpoint),
                status: None,
            },
            ApiError::UnexpectedStatus {
                endpoint,
                status,
                body,
            } => CoreError::Api {
                message: if body.is_empty() {
                    format!("{endpoint} returned HTTP {status}")
                } else {
                    format!("{endpoint} returned HTTP {status}: {body}")
                },
                endpoint: Some(endpoint),
                status: Some(status),
            },
            ApiError::Deserialization {
                endpoint, message, ..
            } => CoreError::Api {
                message: format!("{endpoint}: unreadable response: {message}"),
                endpoint: Some(endpoint),
                status: None,
            },
            ApiError::ConnectFailed { url, reason } => CoreError::ConnectionFailed { url, reason },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Client(message) => CoreError::Internal(message),
        }
    }
}
