// Shared transport configuration for building reqwest::Client instances.
//
// The vendor client and the Pushy listener share TLS and timeout settings
// through this module. The shared service credential used for HTTP Basic
// auth on every vendor request also lives here.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default vendor API root.
pub const DEFAULT_BASE_URL: &str = "https://cloud.multitek.com.tr:8096/multitek_service/root";

/// Default Pushy API root.
pub const DEFAULT_PUSH_BASE_URL: &str = "https://api.pushy.me";

/// [`DEFAULT_BASE_URL`], parsed once.
pub static DEFAULT_API_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL"));

/// [`DEFAULT_PUSH_BASE_URL`], parsed once.
pub static DEFAULT_PUSH_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(DEFAULT_PUSH_BASE_URL).expect("DEFAULT_PUSH_BASE_URL is a valid URL")
});

/// Service account the vendor's mobile app uses for Basic auth.
const SERVICE_USERNAME: &str = "multitek";
const SERVICE_PASSWORD: &str = "Mlt.3838!";

const USER_AGENT: &str = concat!("diafon/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate. The vendor cloud serves a certificate that
    /// does not chain to public roots, so this is the default.
    #[default]
    DangerAcceptInvalid,
}

/// HTTP Basic credential attached to every vendor request.
#[derive(Debug, Clone)]
pub struct ServiceCredentials {
    pub username: String,
    pub password: SecretString,
}

impl Default for ServiceCredentials {
    fn default() -> Self {
        Self {
            username: SERVICE_USERNAME.into(),
            password: SecretString::from(SERVICE_PASSWORD),
        }
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// The timeout applies per request; the push long-poll overrides it
    /// per call.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path).map_err(|e| {
                    crate::error::Error::Tls(format!("failed to read CA cert: {e}"))
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| crate::error::Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_match_vendor_app() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(matches!(config.tls, TlsMode::DangerAcceptInvalid));

        let creds = ServiceCredentials::default();
        assert_eq!(creds.username, "multitek");
        assert_eq!(creds.password.expose_secret(), "Mlt.3838!");
    }

    #[test]
    fn default_urls_parse() {
        assert_eq!(DEFAULT_API_URL.host_str(), Some("cloud.multitek.com.tr"));
        assert_eq!(DEFAULT_API_URL.port(), Some(8096));
        assert_eq!(DEFAULT_API_URL.path(), "/multitek_service/root");
        assert_eq!(DEFAULT_PUSH_URL.as_str(), "https://api.pushy.me/");
    }

    #[test]
    fn missing_ca_file_is_tls_error() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/ca.pem")),
            ..TransportConfig::default()
        };
        let err = config.build_client().unwrap_err();
        assert!(matches!(err, crate::error::Error::Tls(_)));
    }
}
