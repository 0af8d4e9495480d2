//! Account setup: collect identity, validate against the cloud, save.

use std::io::IsTerminal;

use dialoguer::Input;
use diafon_core::Coordinator;
use uuid::Uuid;

use crate::cli::{GlobalOpts, SetupArgs};
use crate::config::{self, Profile};
use crate::error::CliError;

use super::util::prompt_err;

/// New phone ids look like the ones the vendor app registers.
fn generate_phone_id() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}

/// `"{user_name} {user_surname}"` when the account has one, else the e-mail.
fn profile_title(display_name: Option<String>, email: &str) -> String {
    display_name.unwrap_or_else(|| email.to_owned())
}

fn prompt_email() -> Result<String, CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "email".into(),
            reason: "pass --email when not running interactively".into(),
        });
    }
    Input::new()
        .with_prompt("Account e-mail")
        .interact_text()
        .map_err(prompt_err)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SetupArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);
    let existing = cfg.profiles.get(&profile_name).cloned();

    // 1. Identity
    let email = match global.email.clone() {
        Some(email) => email,
        None => prompt_email()?,
    };
    let email = email.trim().to_owned();
    if email.is_empty() {
        return Err(CliError::Validation {
            field: "email".into(),
            reason: "must not be empty".into(),
        });
    }

    let phone_id = args
        .device_id
        .clone()
        .or_else(|| global.phone_id.clone())
        .or_else(|| existing.as_ref().map(|p| p.phone_id.clone()))
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(generate_phone_id);

    // 2. Password (optional; invited users have none)
    let mut profile = existing.unwrap_or_default();
    config::apply_overrides(&mut profile, global);
    profile.email = email;
    profile.phone_id = phone_id;

    if args.ask_password {
        let password =
            rpassword::prompt_password("Password (empty for none): ").map_err(prompt_err)?;
        profile.password = (!password.is_empty()).then_some(password);
        profile.password_env = None;
    } else if let Some(env_name) = args.password_env {
        profile.password_env = Some(env_name);
        profile.password = None;
    }

    // 3. Validate
    profile.title = if args.no_validate {
        Some(profile.email.clone())
    } else {
        Some(validate(&profile, &cfg, &profile_name).await?)
    };

    // 4. Save
    let title = profile.title.clone().unwrap_or_default();
    let phone_id = profile.phone_id.clone();
    cfg.upsert_profile(&profile_name, profile);
    config::save_config(&cfg)?;

    if !global.quiet {
        eprintln!("✓ Profile '{profile_name}' saved: {title}");
        eprintln!("  Phone id: {phone_id}");
        eprintln!("  Config:   {}", config::config_path().display());
    }
    Ok(())
}

/// Log in once and read the account title.
async fn validate(
    profile: &Profile,
    cfg: &config::Config,
    profile_name: &str,
) -> Result<String, CliError> {
    let coordinator_config = config::profile_to_coordinator_config(profile, &cfg.defaults)?;

    let display_name = Coordinator::oneshot(coordinator_config, |c| async move {
        Ok(c.snapshot().and_then(|snap| snap.account.display_name()))
    })
    .await
    .map_err(|e| CliError::from_setup(e, profile_name))?;

    Ok(profile_title(display_name, &profile.email))
}
