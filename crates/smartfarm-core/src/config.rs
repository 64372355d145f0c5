// ── Runtime backend configuration ──
//
// These types describe *how* to reach a SmartFarm backend. They carry
// credentials and connection tuning but never touch disk; the CLI (via
// smartfarm-config) builds a `BackendConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use smartfarm_api::{ReconnectPolicy, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// How to authenticate against the backend.
#[derive(Debug, Clone, Default)]
pub enum AuthCredentials {
    /// No credentials; only public endpoints will work.
    #[default]
    None,
    /// Previously issued token pair (e.g. restored from the keyring).
    Token {
        access: SecretString,
        refresh: Option<SecretString>,
    },
    /// Email + password exchanged for tokens on `login()`.
    Password { email: String, password: SecretString },
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (local development backends with self-signed certs).
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub(crate) fn to_tls_mode(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Configuration for one backend.
///
/// Built by the CLI, passed to `Backend` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// REST base URL, e.g. `http://localhost:8000/api`.
    pub api_url: Url,
    /// Realtime endpoint, e.g. `ws://localhost:8000/ws`.
    pub ws_url: Url,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// HTTP request timeout.
    pub timeout: Duration,
    pub reconnect: ReconnectPolicy,
    /// Open the realtime channel on `start_realtime()`.
    pub realtime_enabled: bool,
}

impl BackendConfig {
    /// Config for `api_url` with defaults for everything else. The realtime
    /// URL is derived from the API host (`http` → `ws`, path `/ws`).
    pub fn new(api_url: Url) -> Result<Self, CoreError> {
        let ws_url = derive_ws_url(&api_url)?;
        Ok(Self {
            api_url,
            ws_url,
            auth: AuthCredentials::None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
            realtime_enabled: true,
        })
    }

    pub fn with_auth(mut self, auth: AuthCredentials) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_ws_url(mut self, ws_url: Url) -> Self {
        self.ws_url = ws_url;
        self
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_tls_mode(),
            timeout: self.timeout,
        }
    }
}

/// `http(s)://host:port/anything` → `ws(s)://host:port/ws`.
pub fn derive_ws_url(api_url: &Url) -> Result<Url, CoreError> {
    let scheme = match api_url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(CoreError::Config {
                message: format!("unsupported URL scheme '{other}' in {api_url}"),
            });
        }
    };
    let host = api_url.host_str().ok_or_else(|| CoreError::Config {
        message: format!("URL has no host: {api_url}"),
    })?;
    let raw = match api_url.port() {
        Some(port) => format!("{scheme}://{host}:{port}/ws"),
        None => format!("{scheme}://{host}/ws"),
    };
    Url::parse(&raw).map_err(|e| CoreError::Config {
        message: format!("invalid realtime URL {raw}: {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_follows_api_scheme_and_port() {
        let api = Url::parse("http://localhost:8000/api").unwrap();
        assert_eq!(derive_ws_url(&api).unwrap().as_str(), "ws://localhost:8000/ws");

        let api = Url::parse("https://farm.example.com/api/v1").unwrap();
        assert_eq!(derive_ws_url(&api).unwrap().as_str(), "wss://farm.example.com/ws");
    }

    #[test]
    fn unsupported_scheme_is_a_config_error() {
        let api = Url::parse("ftp://farm.example.com/api").unwrap();
        assert!(matches!(derive_ws_url(&api), Err(CoreError::Config { .. })));
    }

    #[test]
    fn defaults() {
        let config = BackendConfig::new(Url::parse("http://localhost:8000/api").unwrap()).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.reconnect.max_attempts, 5);
        assert!(config.realtime_enabled);
        assert!(matches!(config.auth, AuthCredentials::None));
    }
}
