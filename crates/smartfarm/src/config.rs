//! CLI configuration: thin wrapper around `smartfarm_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--api-url, --token, etc.).

use std::time::Duration;

use secrecy::SecretString;

use smartfarm_core::{AuthCredentials, BackendConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use smartfarm_config::{
    Config, DEFAULT_API_URL, Profile, clear_tokens, config_path, load_config_or_default,
    save_config, store_password, store_tokens,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Build a `BackendConfig` from the config file, the active profile and
/// CLI flag overrides.
///
/// With no profile configured, `--api-url` (or the local default backend)
/// is used with whatever credentials the environment provides.
pub fn resolve_backend_config(global: &GlobalOpts) -> Result<(BackendConfig, String), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => Profile::new(DEFAULT_API_URL),
    };

    let config = apply_overrides(&profile, &profile_name, &cfg, global)?;
    Ok((config, profile_name))
}

/// Translate a `Profile` + global flags into a `BackendConfig`.
///
/// CLI flag overrides take priority over profile values.
fn apply_overrides(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<BackendConfig, CliError> {
    let mut profile = profile.clone();

    // 1. URLs (flag > env > profile)
    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
        // A realtime URL from the profile belongs to the old host.
        if global.ws_url.is_none() {
            profile.ws_url = None;
        }
    }
    if let Some(ref url) = global.ws_url {
        profile.ws_url = Some(url.clone());
    }

    // 2. Timeout flag wins over profile and defaults
    profile.timeout = Some(global.timeout);

    let mut config = smartfarm_config::profile_to_backend_config(&profile, profile_name, &cfg.defaults)?;

    // 3. Token flag
    if let Some(ref token) = global.token {
        config.auth = AuthCredentials::Token {
            access: SecretString::from(token.clone()),
            refresh: None,
        };
    }

    // 4. TLS
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }

    config.timeout = Duration::from_secs(global.timeout);
    Ok(config)
}
