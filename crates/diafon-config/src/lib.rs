//! Shared configuration for the diafon CLI.
//!
//! TOML profiles (one per DiafonBox account), password resolution
//! (env + plaintext), and translation to `diafon_core::CoordinatorConfig`.
//! The CLI adds `GlobalOpts`-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use diafon_core::config::DEFAULT_SCAN_INTERVAL_SECS;
use diafon_core::{CoordinatorConfig, TlsVerification};

/// Environment variable consulted for the account password.
pub const PASSWORD_ENV: &str = "DIAFON_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    ProfileNotFound { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

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
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
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
    /// Profile name to use: the override, else `default_profile`, else
    /// `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                profile: name.into(),
            })
    }

    /// Insert or replace a profile. The first profile saved becomes the
    /// default.
    pub fn upsert_profile(&mut self, name: &str, profile: Profile) {
        if self.profiles.is_empty() && self.default_profile.is_none() {
            self.default_profile = Some(name.into());
        }
        self.profiles.insert(name.into(), profile);
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between periodic refreshes in long-running commands.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Run the push listener in long-running commands.
    #[serde(default = "default_push")]
    pub push: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            scan_interval: default_scan_interval(),
            push: default_push(),
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
fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}
fn default_push() -> bool {
    true
}

/// A named account profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Display title, `"{user_name} {user_surname}"` as of setup.
    pub title: Option<String>,

    /// Account e-mail.
    pub email: String,

    /// Registered phone (device) id.
    pub phone_id: String,

    /// Account password (plaintext -- prefer the env var). Invited users
    /// have none.
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Override the vendor service root.
    pub api_url: Option<String>,

    /// Override the root snapshot paths are resolved against.
    pub image_url: Option<String>,

    /// Override the push provider root.
    pub push_url: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Verify the vendor certificate against system roots. The vendor
    /// cloud serves a certificate that does not verify, so this is off
    /// unless set.
    pub verify_tls: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override refresh interval.
    pub scan_interval: Option<u64>,

    /// Override push listener.
    pub push: Option<bool>,
}

impl Profile {
    pub fn new(email: impl Into<String>, phone_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone_id: phone_id.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "diafon", "diafon").map_or_else(
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
    p.push("diafon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment. A missing file yields the
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DIAFON_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
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
    debug!(path = %path.display(), "config saved");
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the account password, if any.
///
/// Order: the profile's `password_env` variable, `DIAFON_PASSWORD`, the
/// plaintext value. `None` means the account logs in without one.
pub fn resolve_password(profile: &Profile) -> Option<SecretString> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Some(SecretString::from(pw));
    }

    // 3. Plaintext in config
    profile
        .password
        .as_ref()
        .filter(|pw| !pw.is_empty())
        .map(|pw| SecretString::from(pw.clone()))
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

/// Build a `CoordinatorConfig` from a profile and the global defaults --
/// no CLI flag overrides.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    require("email", &profile.email)?;
    require("phone_id", &profile.phone_id)?;

    let mut config = CoordinatorConfig::new(profile.email.trim(), profile.phone_id.trim());
    config.password = resolve_password(profile);

    if let Some(ref raw) = profile.api_url {
        config.api_url = parse_url("api_url", raw)?;
    }
    if let Some(ref raw) = profile.image_url {
        config.image_url = Some(parse_url("image_url", raw)?);
    }
    if let Some(ref raw) = profile.push_url {
        config.push_url = parse_url("push_url", raw)?;
    }

    config.tls = if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else if profile.verify_tls.unwrap_or(false) {
        TlsVerification::SystemDefaults
    } else {
        TlsVerification::DangerAcceptInvalid
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.scan_interval_secs = profile.scan_interval.unwrap_or(defaults.scan_interval);
    config.push_enabled = profile.push.unwrap_or(defaults.push);

    Ok(config)
}
