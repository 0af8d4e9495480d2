// ── Runtime coordinator configuration ──
//
// These types describe *how* to reach the DiafonBox cloud and how often
// to poll it. They carry credential data and tuning, but never touch
// disk. The CLI builds a `CoordinatorConfig` and hands it in.

use std::time::Duration;

use diafon_api::AppInfo;
use diafon_api::transport::{DEFAULT_API_URL, DEFAULT_PUSH_URL};
use secrecy::SecretString;
use url::Url;

/// Default polling interval.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 30;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. The vendor cloud's certificate does not chain
    /// to public roots.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one account.
///
/// Built by the CLI, passed to `Coordinator`; core never reads config files.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Account email.
    pub email: String,
    /// Phone id registered on the account.
    pub phone_id: String,
    /// Password, for accounts that log in with one.
    pub password: Option<SecretString>,
    /// Vendor service root.
    pub api_url: Url,
    /// Root that snapshot paths resolve against; `None` = service origin.
    pub image_url: Option<Url>,
    /// Pushy API root.
    pub push_url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How often to refresh (seconds). 0 = only on request.
    pub scan_interval_secs: u64,
    /// Try to set up the push listener after the first refresh.
    pub push_enabled: bool,
    /// How this host presents itself to `resumeApp`.
    pub app: AppInfo,
}

impl CoordinatorConfig {
    pub fn new(email: impl Into<String>, phone_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone_id: phone_id.into(),
            ..Self::default()
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            phone_id: String::new(),
            password: None,
            api_url: DEFAULT_API_URL.clone(),
            image_url: None,
            push_url: DEFAULT_PUSH_URL.clone(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            push_enabled: true,
            app: AppInfo::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_vendor_and_pushy() {
        let config = CoordinatorConfig::new("user@example.com", "PHONE-1");
        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL.as_str());
        assert_eq!(config.push_url.host_str(), Some("api.pushy.me"));
        assert!(config.image_url.is_none());
        assert!(config.push_enabled);
        assert_eq!(config.scan_interval_secs, DEFAULT_SCAN_INTERVAL_SECS);
    }
}
