//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use geekmagic_config::ConfigError;
use geekmagic_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach device at {url}")]
    #[diagnostic(
        code(geekmagic::connection_failed),
        help(
            "Check that the device is powered on and on the same network.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Device request timed out after {seconds}s")]
    #[diagnostic(
        code(geekmagic::timeout),
        help("The device may be busy; set defaults.timeout in the config to wait longer.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(geekmagic::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Device / API ─────────────────────────────────────────────────
    #[error("Device error: {message}")]
    #[diagnostic(code(geekmagic::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    #[error("'{operation}' is not supported by this device")]
    #[diagnostic(
        code(geekmagic::unsupported),
        help("This command requires {required}. Run: geekmagic status to see the detected firmware.")
    )]
    Unsupported { operation: String, required: String },

    #[error("{failed} of {total} deliveries failed")]
    #[diagnostic(code(geekmagic::partial_delivery))]
    PartialDelivery { failed: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(geekmagic::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No device selected")]
    #[diagnostic(
        code(geekmagic::no_device),
        help(
            "Pass --host <address>, pass --device <name>, or set default_device in\n\
             {path}"
        )
    )]
    NoDevice { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(geekmagic::config))]
    Config { message: String },

    // ── IO / Internal ────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(geekmagic::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoDevice { .. } => exit_code::USAGE,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AggregateUnavailable { device, reason } => CliError::ConnectionFailed {
                url: device,
                reason,
            },

            CoreError::Timeout { timeout_secs, .. } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                hint: "Run: geekmagic config show to see configured devices".into(),
            },

            CoreError::NotFound { endpoint } => CliError::NotFound {
                resource_type: "endpoint".into(),
                identifier: endpoint,
                hint: "This firmware does not provide the endpoint.".into(),
            },

            CoreError::Unsupported {
                operation,
                required,
            } => CliError::Unsupported {
                operation,
                required,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api {
                message, status, ..
            } => CliError::ApiError { message, status },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownDevice { name } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: name,
                hint: "Run: geekmagic config show to see configured devices".into(),
            },
            ConfigError::NoDevice => CliError::NoDevice {
                path: geekmagic_config::config_path().display().to_string(),
            },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
