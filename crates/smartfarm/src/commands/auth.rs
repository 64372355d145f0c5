//! Login, logout and whoami.

use secrecy::SecretString;

use smartfarm_core::Backend;
use smartfarm_core::types::UserProfile;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

fn user_detail(u: &UserProfile) -> String {
    [
        format!("Name:  {}", u.display_name()),
        format!("Email: {}", u.email),
        format!("User:  {}", output::opt(u.username.as_deref())),
        format!("Role:  {}", output::opt(u.role.as_deref())),
        format!("Phone: {}", output::opt(u.phone.as_deref())),
    ]
    .join("\n")
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub async fn login(backend: &Backend, args: LoginArgs, profile_name: &str) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let email = args
        .email
        .or_else(|| cfg.profiles.get(profile_name).and_then(|p| p.email.clone()))
        .ok_or_else(|| CliError::Validation {
            field: "email".into(),
            reason: "no email given; pass --email or run `smartfarm config set email <EMAIL>`".into(),
        })?;

    let password = match std::env::var("SMARTFARM_PASSWORD") {
        Ok(pw) => pw,
        Err(_) => rpassword::prompt_password(format!("Password for {email}: ")).map_err(prompt_err)?,
    };
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }

    let resp = backend
        .login_with(&email, &SecretString::from(password))
        .await
        .map_err(|e| CliError::AuthFailed {
            profile: profile_name.to_owned(),
            message: e.user_message(),
        })?;

    let access = SecretString::from(resp.access);
    let refresh = SecretString::from(resp.refresh);
    if let Err(e) = config::store_tokens(profile_name, &access, Some(&refresh)) {
        tracing::warn!(error = %e, "could not store tokens in keyring; this login lasts for one command");
    }

    if let Some(user) = resp.user {
        eprintln!("✓ Logged in as {} on profile '{profile_name}'", user.display_name());
    }
    Ok(())
}

pub fn logout(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);
    config::clear_tokens(&profile_name)?;
    if !global.quiet {
        eprintln!("✓ Logged out of profile '{profile_name}'");
    }
    Ok(())
}

pub async fn whoami(backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    let user = backend.current_user().await?;
    let out = output::render_single(&global.output, &user, user_detail, |u| u.email.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
