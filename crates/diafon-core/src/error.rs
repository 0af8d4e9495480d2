// ── Core error types ──
//
// User-facing errors from diafon-core. Consumers never see raw HTTP
// status codes or JSON parse failures directly; the
// `From<diafon_api::Error>` impl translates transport-layer errors into
// domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the DiafonBox cloud at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("No data has been loaded yet")]
    NoData,

    #[error("Location not found: {location_id}")]
    LocationNotFound { location_id: String },

    #[error("No door unit registered for {location}")]
    NoDoorDevice { location: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` when retrying with the same credentials is pointless.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<diafon_api::Error> for CoreError {
    fn from(err: diafon_api::Error) -> Self {
        match err {
            diafon_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            diafon_api::Error::Transport(ref e) => {
                if err.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: err.status(),
                    }
                }
            }
            diafon_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            diafon_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            diafon_api::Error::Status { status, endpoint } => CoreError::Api {
                message: format!("{endpoint} returned HTTP {status}"),
                status: Some(status),
            },
            diafon_api::Error::MissingSip => CoreError::Api {
                message: "account has no SIP address".into(),
                status: None,
            },
            diafon_api::Error::Push(message) => CoreError::Api {
                message: format!("push service: {message}"),
                status: None,
            },
            diafon_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("unexpected response: {message}"),
                status: None,
            },
        }
    }
}
