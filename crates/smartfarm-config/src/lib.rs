//! Shared configuration for SmartFarm tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! token persistence, and translation to `smartfarm_core::BackendConfig`.
//! The CLI layers its flag overrides on top of this.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use smartfarm_core::{AuthCredentials, BackendConfig, ReconnectPolicy, TlsVerification};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "smartfarm";

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// REST base URL (e.g. "http://localhost:8000/api").
    pub api_url: String,

    /// Realtime endpoint; derived from `api_url` when unset.
    pub ws_url: Option<String>,

    /// Login email.
    pub email: Option<String>,

    /// Password (plaintext -- prefer keyring or `SMARTFARM_PASSWORD`).
    pub password: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Open the realtime channel for commands that use it.
    pub realtime: Option<bool>,

    /// Attempts before the realtime channel gives up.
    pub reconnect_attempts: Option<u32>,

    /// Seconds between realtime reconnect attempts.
    pub reconnect_delay: Option<u64>,
}

impl Profile {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "smartfarm", "smartfarm").map_or_else(
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
    p.push("smartfarm");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path`, then `SMARTFARM_*` variables (`__` separates
/// nesting, e.g. `SMARTFARM_DEFAULTS__TIMEOUT=60`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SMARTFARM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token persistence ───────────────────────────────────────────────

fn keyring_entry(profile_name: &str, what: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{what}"))?)
}

fn keyring_get(profile_name: &str, what: &str) -> Option<SecretString> {
    keyring_entry(profile_name, what)
        .ok()?
        .get_password()
        .ok()
        .map(SecretString::from)
}

/// Remember a token pair after a successful login.
pub fn store_tokens(
    profile_name: &str,
    access: &SecretString,
    refresh: Option<&SecretString>,
) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "access-token")?.set_password(access.expose_secret())?;
    if let Some(refresh) = refresh {
        keyring_entry(profile_name, "refresh-token")?.set_password(refresh.expose_secret())?;
    }
    debug!(profile = profile_name, "stored tokens in keyring");
    Ok(())
}

/// Forget stored tokens. Missing entries are not an error.
pub fn clear_tokens(profile_name: &str) -> Result<(), ConfigError> {
    for what in ["access-token", "refresh-token"] {
        match keyring_entry(profile_name, what)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Store a password for `profile_name` in the keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "password")?.set_password(password.expose_secret())?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Token pair from `SMARTFARM_TOKEN` or the keyring.
pub fn resolve_tokens(profile_name: &str) -> Option<(SecretString, Option<SecretString>)> {
    // 1. Env var
    if let Ok(token) = std::env::var("SMARTFARM_TOKEN") {
        return Some((SecretString::from(token), None));
    }

    // 2. Keyring, from a previous `login`
    let access = keyring_get(profile_name, "access-token")?;
    Some((access, keyring_get(profile_name, "refresh-token")))
}

/// Email + password from env, keyring, or plaintext config.
pub fn resolve_password_credentials(profile: &Profile, profile_name: &str) -> Option<(String, SecretString)> {
    let email = std::env::var("SMARTFARM_EMAIL")
        .ok()
        .or_else(|| profile.email.clone())?;

    // 1. Env var
    if let Ok(pw) = std::env::var("SMARTFARM_PASSWORD") {
        return Some((email, SecretString::from(pw)));
    }

    // 2. Keyring
    if let Some(pw) = keyring_get(profile_name, "password") {
        return Some((email, pw));
    }

    // 3. Plaintext in config
    profile
        .password
        .clone()
        .map(|pw| (email, SecretString::from(pw)))
}

/// Pick credentials for a profile: stored tokens win over a password
/// login; no credentials at all is allowed (public endpoints only).
pub fn resolve_auth(profile: &Profile, profile_name: &str) -> AuthCredentials {
    if let Some((access, refresh)) = resolve_tokens(profile_name) {
        return AuthCredentials::Token { access, refresh };
    }
    match resolve_password_credentials(profile, profile_name) {
        Some((email, password)) => AuthCredentials::Password { email, password },
        None => AuthCredentials::None,
    }
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `BackendConfig` from a profile, without CLI flag overrides.
pub fn profile_to_backend_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<BackendConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    let mut config = BackendConfig::new(api_url).map_err(|e| ConfigError::Validation {
        field: "api_url".into(),
        reason: e.to_string(),
    })?;

    if let Some(ref raw) = profile.ws_url {
        config = config.with_ws_url(parse_url("ws_url", raw)?);
    }

    config.auth = resolve_auth(profile, profile_name);

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.realtime_enabled = profile.realtime.unwrap_or(true);

    let base = ReconnectPolicy::default();
    config.reconnect = ReconnectPolicy {
        delay: profile.reconnect_delay.map_or(base.delay, Duration::from_secs),
        max_attempts: profile.reconnect_attempts.unwrap_or(base.max_attempts),
    };

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.active_profile_name(), "default");
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.default_profile = Some("field-office".into());
        let mut profile = Profile::new("https://farm.example.com/api");
        profile.email = Some("ops@example.com".into());
        profile.timeout = Some(10);
        cfg.profiles.insert("field-office".into(), profile);
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.active_profile_name(), "field-office");
        let profile = &loaded.profiles["field-office"];
        assert_eq!(profile.api_url, "https://farm.example.com/api");
        assert_eq!(profile.email.as_deref(), Some("ops@example.com"));
        assert_eq!(profile.timeout, Some(10));
    }

    #[test]
    fn profile_translates_to_backend_config() {
        let mut profile = Profile::new("https://farm.example.com/api");
        profile.timeout = Some(12);
        profile.reconnect_attempts = Some(8);
        profile.realtime = Some(false);

        let cfg = profile_to_backend_config(&profile, "unit-test-profile", &Defaults::default()).unwrap();
        assert_eq!(cfg.api_url.as_str(), "https://farm.example.com/api");
        assert_eq!(cfg.ws_url.as_str(), "wss://farm.example.com/ws");
        assert_eq!(cfg.timeout, Duration::from_secs(12));
        assert_eq!(cfg.reconnect.max_attempts, 8);
        assert_eq!(cfg.reconnect.delay, Duration::from_secs(1));
        assert!(!cfg.realtime_enabled);
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn insecure_and_ca_cert_select_tls_mode() {
        let mut profile = Profile::new("http://localhost:8000/api");
        profile.ca_cert = Some(PathBuf::from("/etc/ssl/farm-ca.pem"));
        let cfg = profile_to_backend_config(&profile, "unit-test-profile", &Defaults::default()).unwrap();
        assert_eq!(cfg.tls, TlsVerification::CustomCa(PathBuf::from("/etc/ssl/farm-ca.pem")));

        profile.insecure = Some(true);
        let cfg = profile_to_backend_config(&profile, "unit-test-profile", &Defaults::default()).unwrap();
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn explicit_ws_url_wins() {
        let mut profile = Profile::new("http://localhost:8000/api");
        profile.ws_url = Some("ws://realtime.local:9001/ws".into());
        let cfg = profile_to_backend_config(&profile, "unit-test-profile", &Defaults::default()).unwrap();
        assert_eq!(cfg.ws_url.as_str(), "ws://realtime.local:9001/ws");
    }

    #[test]
    fn bad_url_is_a_validation_error() {
        let profile = Profile::new("not a url");
        let err = profile_to_backend_config(&profile, "unit-test-profile", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_url"));
    }
}
