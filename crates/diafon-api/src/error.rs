use thiserror::Error;

/// Top-level error type for the `diafon-api` crate.
///
/// Only [`Error::Authentication`] is the authentication kind; every other
/// variant is an API failure. `diafon-core` maps these into user-facing
/// diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected, or the login exchange did not validate.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or client construction failure.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Vendor API ──────────────────────────────────────────────────
    /// Non-200, non-401 HTTP status from a vendor endpoint.
    #[error("API error on {endpoint}: HTTP {status}")]
    Status { status: u16, endpoint: String },

    /// The account has no SIP address, so a door call cannot be placed.
    #[error("Account SIP address is not available")]
    MissingSip,

    // ── Push ────────────────────────────────────────────────────────
    /// Pushy rejected an auth/subscribe/unsubscribe request.
    #[error("Push service error: {0}")]
    Push(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for the authentication kind; everything else is an
    /// API error.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the request timed out at the transport level.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_authentication_is_auth_kind() {
        let auth = Error::Authentication { message: "nope".into() };
        assert!(auth.is_authentication());
        assert_eq!(auth.status(), Some(401));

        let status = Error::Status { status: 500, endpoint: "getAccount".into() };
        assert!(!status.is_authentication());
        assert!(!Error::MissingSip.is_authentication());
        assert!(!Error::Push("x".into()).is_authentication());
    }

    #[test]
    fn status_error_names_endpoint() {
        let err = Error::Status { status: 503, endpoint: "getCallAllRecords".into() };
        assert_eq!(err.to_string(), "API error on getCallAllRecords: HTTP 503");
    }
}
