//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a distinct exit code per error class.

use miette::Diagnostic;
use thiserror::Error;

use smartfarm_config::ConfigError;
use smartfarm_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the SmartFarm backend at {url}")]
    #[diagnostic(
        code(smartfarm::connection_failed),
        help(
            "Check that the backend is running and accessible.\n\
             Reason: {reason}\n\
             Set the URL with: smartfarm config set api_url <URL>"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Realtime connection lost")]
    #[diagnostic(
        code(smartfarm::realtime),
        help("The server stopped accepting the WebSocket connection after repeated retries.\nWS URL: {url}")
    )]
    RealtimeLost { url: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(smartfarm::auth_failed),
        help("Log in again with: smartfarm login --profile {profile}")
    )]
    AuthFailed { profile: String, message: String },

    #[error("No email configured for profile '{profile}'")]
    #[diagnostic(
        code(smartfarm::no_credentials),
        help(
            "Pass --email, set SMARTFARM_EMAIL, or run:\n\
             smartfarm config set email <EMAIL>"
        )
    )]
    NoCredentials { profile: String },

    // ── Backend responses ────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(smartfarm::api_error))]
    Api { status: Option<u16>, message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(smartfarm::not_found),
        help("Run: smartfarm {list_command} to see available entries")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(smartfarm::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(smartfarm::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: smartfarm config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(smartfarm::config))]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(smartfarm::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(smartfarm::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(smartfarm::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::RealtimeLost { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Api { status, .. } => match status {
                Some(401) => exit_code::AUTH,
                Some(403) => exit_code::PERMISSION,
                Some(404) => exit_code::NOT_FOUND,
                Some(409) => exit_code::CONFLICT,
                _ => exit_code::GENERAL,
            },
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },

            CoreError::ChannelClosed => Self::RealtimeLost {
                url: "(not connected)".into(),
            },

            CoreError::AuthenticationFailed { .. } | CoreError::SessionExpired => Self::AuthFailed {
                profile: "default".into(),
                message: err.user_message(),
            },

            CoreError::Api { status, .. } => Self::Api {
                status,
                message: err.user_message(),
            },

            CoreError::Validation { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => Self::Api {
                status: None,
                message,
            },
        }
    }
}
