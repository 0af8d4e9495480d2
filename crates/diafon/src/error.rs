//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use diafon_config::ConfigError;
use diafon_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const DOOR: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot connect to the DiafonBox cloud")]
    #[diagnostic(
        code(diafon::cannot_connect),
        help(
            "{reason}\n\
             Check your network connection, or --api-url if you override it."
        )
    )]
    CannotConnect { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(diafon::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Invalid authentication for profile '{profile}'")]
    #[diagnostic(
        code(diafon::invalid_auth),
        help(
            "{message}\n\
             Check the e-mail and phone id, and the password if the account has one.\n\
             Re-run: diafon setup --profile {profile}"
        )
    )]
    InvalidAuth { profile: String, message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(diafon::not_found),
        help("Run: diafon {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No door unit at {location}")]
    #[diagnostic(
        code(diafon::no_door_device),
        help("Run: diafon locations to see which locations have a door unit")
    )]
    NoDoorDevice { location: String },

    #[error("Failed to open the door at {location}")]
    #[diagnostic(code(diafon::door_failed), help("{reason}"))]
    DoorFailed { location: String, reason: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(diafon::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(diafon::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(diafon::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: diafon setup --email you@example.com"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No account configured")]
    #[diagnostic(
        code(diafon::no_config),
        help(
            "Create a profile with: diafon setup --email you@example.com\n\
             Or pass --email and --phone-id.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(diafon::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CannotConnect { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::InvalidAuth { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::NoDoorDevice { .. } | Self::ProfileNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::DoorFailed { .. } => exit_code::DOOR,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            Self::ApiError { .. } | Self::Config(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }

    /// Setup-flow mapping: authentication failures are `invalid_auth`,
    /// everything else is `cannot_connect`.
    pub fn from_setup(err: CoreError, profile: &str) -> Self {
        if err.is_authentication() {
            Self::InvalidAuth {
                profile: profile.into(),
                message: err.to_string(),
            }
        } else {
            Self::CannotConnect {
                reason: err.to_string(),
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::ProfileNotFound { profile } => Self::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::CannotConnect {
                reason: if url.is_empty() {
                    reason
                } else {
                    format!("{url}: {reason}")
                },
            },

            CoreError::AuthenticationFailed { message } => CliError::InvalidAuth {
                profile: "current".into(),
                message,
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::NoData => CliError::ApiError {
                message: "no data received from the cloud yet".into(),
            },

            CoreError::LocationNotFound { location_id } => CliError::NotFound {
                resource_type: "location".into(),
                identifier: location_id,
                list_command: "locations".into(),
            },

            CoreError::NoDoorDevice { location } => CliError::NoDoorDevice { location },

            CoreError::Api { message, status } => CliError::ApiError {
                message: match status {
                    Some(status) => format!("{message} (HTTP {status})"),
                    None => message,
                },
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_auth_failure_is_invalid_auth() {
        let err = CliError::from_setup(
            CoreError::AuthenticationFailed {
                message: "bad".into(),
            },
            "home",
        );
        assert!(matches!(err, CliError::InvalidAuth { ref profile, .. } if profile == "home"));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn setup_other_failure_is_cannot_connect() {
        let err = CliError::from_setup(
            CoreError::Api {
                message: "getAccount returned HTTP 500".into(),
                status: Some(500),
            },
            "home",
        );
        assert!(matches!(err, CliError::CannotConnect { .. }));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn missing_location_is_not_found() {
        let err: CliError = CoreError::LocationNotFound {
            location_id: "L9".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(err.to_string().contains("L9"));
    }
}
