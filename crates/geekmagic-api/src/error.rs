use thiserror::Error;

/// Top-level error type for the `geekmagic-api` crate.
///
/// Every request-level variant is tagged with the device endpoint that
/// failed (`app.json`, `set`, `doUpload`, ...). `geekmagic-core` maps these
/// into user-facing errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Request outcomes ────────────────────────────────────────────
    /// The device answered 404. Treated as "value unavailable", never retried.
    #[error("{endpoint}: not found on device")]
    NotFound { endpoint: String },

    /// No response within the per-attempt deadline.
    #[error("{endpoint}: request timed out after {timeout_secs}s")]
    Timeout { endpoint: String, timeout_secs: u64 },

    /// Connection refused, DNS failure, broken socket, malformed response.
    #[error("{endpoint}: transport error: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any non-2xx status other than 404.
    #[error("{endpoint}: unexpected HTTP status {status}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The device returned a body that is not the expected JSON shape.
    #[error("{endpoint}: deserialization error: {message}")]
    Deserialization {
        endpoint: String,
        message: String,
        body: String,
    },

    // ── Aggregate ───────────────────────────────────────────────────
    /// None of the status endpoints could be reached.
    #[error("Cannot connect to device at {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    // ── Construction ────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl Error {
    pub(crate) fn transport(
        endpoint: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            endpoint: endpoint.to_owned(),
            source: source.into(),
        }
    }

    /// Returns `true` if the device answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if another attempt could succeed.
    ///
    /// `NotFound` is a valid answer and construction errors will not change
    /// on retry; everything else the device can throw at us is worth one
    /// more try.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Transport { .. }
                | Self::UnexpectedStatus { .. }
                | Self::Deserialization { .. }
        )
    }

    /// The endpoint this error is tagged with, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::NotFound { endpoint }
            | Self::Timeout { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::UnexpectedStatus { endpoint, .. }
            | Self::Deserialization { endpoint, .. } => Some(endpoint),
            Self::ConnectFailed { .. } | Self::InvalidUrl(_) | Self::Client(_) => None,
        }
    }
}
