// ── Core error types ──
//
// Domain-level errors from smartfarm-core. Consumers never match on raw
// reqwest or serde failures; the `From<smartfarm_api::Error>` impl folds
// transport-layer errors into these variants. `Clone` because one
// in-flight fetch hands the same result to every waiting reader.

use std::collections::BTreeMap;

use thiserror::Error;

pub(crate) const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
pub(crate) const FORBIDDEN: &str = "You do not have permission to perform this action.";
pub(crate) const NOT_FOUND: &str = "The requested resource was not found.";
pub(crate) const SERVER_ERROR: &str = "An unexpected error occurred. Please try again later.";
pub(crate) const NO_RESPONSE: &str = "No response from server. Please check your connection.";

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Realtime channel is not connected")]
    ChannelClosed,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired")]
    SessionExpired,

    // ── Backend responses ────────────────────────────────────────────
    #[error("API error (HTTP {}): {message}", .status.map_or_else(|| "n/a".to_owned(), |s| s.to_string()))]
    Api {
        status: Option<u16>,
        message: String,
        field_errors: BTreeMap<String, Vec<String>>,
    },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status behind this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::AuthenticationFailed { .. })
            || self.status() == Some(401)
    }

    /// Short message suitable for a notification.
    ///
    /// Prefers whatever the server said; otherwise falls back to a
    /// generic message for the status class.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Api { status, .. } => match status {
                Some(401) => SESSION_EXPIRED.into(),
                Some(403) => FORBIDDEN.into(),
                Some(404) => NOT_FOUND.into(),
                Some(s) if *s >= 500 => SERVER_ERROR.into(),
                Some(s) => format!("Request failed with status {s}"),
                None => SERVER_ERROR.into(),
            },
            Self::SessionExpired => SESSION_EXPIRED.into(),
            Self::AuthenticationFailed { message } | Self::Validation { message } => message.clone(),
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => NO_RESPONSE.into(),
            other => other.to_string(),
        }
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            Self::Api { field_errors, .. } if !field_errors.is_empty() => Some(field_errors),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<smartfarm_api::Error> for CoreError {
    fn from(err: smartfarm_api::Error) -> Self {
        use smartfarm_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::SessionExpired => CoreError::SessionExpired,
            ApiError::Transport(ref e) => {
                if let Some(status) = e.status() {
                    CoreError::Api {
                        status: Some(status.as_u16()),
                        message: String::new(),
                        field_errors: BTreeMap::new(),
                    }
                } else if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Api {
                status,
                message,
                errors,
            } => CoreError::Api {
                status: Some(status),
                message,
                field_errors: errors.unwrap_or_default(),
            },
            ApiError::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            ApiError::WebSocketClosed { .. } => CoreError::ChannelClosed,
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
