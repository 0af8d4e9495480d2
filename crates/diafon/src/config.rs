//! CLI configuration -- thin wrapper around `diafon_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--email, --phone-id, etc.).

use std::time::Duration;

use diafon_core::CoordinatorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use diafon_config::{
    Config, Profile, config_path, load_config_or_default, profile_to_coordinator_config,
    resolve_password, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Build a `CoordinatorConfig` from the config file, profile, and CLI
/// overrides.
///
/// Flags take priority over the profile. Without a profile, `--email`
/// and `--phone-id` alone are enough.
pub fn resolve_coordinator_config(global: &GlobalOpts) -> Result<CoordinatorConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => {
            let (Some(email), Some(phone_id)) = (&global.email, &global.phone_id) else {
                return Err(CliError::NoConfig {
                    path: config_path().display().to_string(),
                });
            };
            Profile::new(email.clone(), phone_id.clone())
        }
    };

    apply_overrides(&mut profile, global);

    let mut config = profile_to_coordinator_config(&profile, &cfg.defaults)?;
    if let Some(timeout) = global.timeout {
        config.timeout = Duration::from_secs(timeout);
    }
    Ok(config)
}

/// Fold `--email`, `--phone-id` and `--api-url` into a profile.
pub fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref email) = global.email {
        profile.email.clone_from(email);
    }
    if let Some(ref phone_id) = global.phone_id {
        profile.phone_id.clone_from(phone_id);
    }
    if let Some(ref api_url) = global.api_url {
        profile.api_url = Some(api_url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}
