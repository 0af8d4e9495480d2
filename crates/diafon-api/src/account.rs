// Account endpoints: login, account info, Pushy discovery, app resume.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::{ApiReply, Endpoint, MultitekClient, object};
use crate::error::Error;
use crate::models::{Account, PushCredentials};

/// Pushy app auth key of the vendor's mobile app.
const PUSHY_APP_AUTH: &str = "401c2fe6e2730dd87b2c12c8afe36c11499f7141e9296f3c2cd03bb33a1b3992";

/// How this host identifies itself to `userAccountControl` and `resumeApp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub phone_info: String,
    pub phone_os: String,
    pub app_version: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            phone_info: "diafon".into(),
            phone_os: std::env::consts::OS.into(),
            app_version: concat!("diafon v", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl MultitekClient {
    /// Validate the configured identity.
    ///
    /// With a password, `userAccountControl` must answer with the success
    /// marker; without one (invited users), `getAccount` must return an
    /// account carrying an `email`. Either way the account SIP is cached.
    /// A validation failure is [`Error::Authentication`]; transport and
    /// status failures propagate unchanged.
    pub async fn login(&self) -> Result<(), Error> {
        debug!(email = %self.identity().email, "logging in");

        match self.identity().password.clone() {
            Some(password) => self.login_with_password(&password).await?,
            None => self.login_with_account().await?,
        }

        info!(email = %self.identity().email, "login successful");
        Ok(())
    }

    async fn login_with_password(&self, password: &SecretString) -> Result<(), Error> {
        let digest = format!("{:x}", md5::compute(password.expose_secret().as_bytes()));
        let body = object(json!({
            "password": digest,
            "phone_info": AppInfo::default().phone_info,
            "pushy_token": "",
            "push_kit_token": "",
        }));

        let reply = self.post(Endpoint::UserAccountControl, body).await?;
        if !reply.is_success() {
            return Err(Error::Authentication {
                message: format!("userAccountControl answered {reply}"),
            });
        }

        // SIP is only needed for door calls; open_door refetches if absent.
        match self.get_account().await {
            Ok(account) => self.cache_user_sip(account.sip().map(str::to_owned)),
            Err(e) => debug!(error = %e, "account fetch after login failed"),
        }
        Ok(())
    }

    async fn login_with_account(&self) -> Result<(), Error> {
        let account = match self.get_account().await {
            Ok(account) => account,
            Err(Error::Deserialization { message, .. }) => {
                return Err(Error::Authentication { message });
            }
            Err(e) => return Err(e),
        };

        if account.email.is_none() {
            return Err(Error::Authentication {
                message: "account response has no email (unknown email or phone id)".into(),
            });
        }

        self.cache_user_sip(account.sip().map(str::to_owned));
        Ok(())
    }

    /// Fetch the account. A non-object response is a deserialization error.
    pub async fn get_account(&self) -> Result<Account, Error> {
        let reply = self.post(Endpoint::GetAccount, serde_json::Map::new()).await?;
        match reply {
            ApiReply::Json(value @ Value::Object(_)) => {
                let raw = value.to_string();
                serde_json::from_value(value).map_err(|e| Error::Deserialization {
                    message: format!("getAccount: {e}"),
                    body: raw,
                })
            }
            ApiReply::Json(other) => Err(Error::Deserialization {
                message: "getAccount: expected a JSON object".into(),
                body: other.to_string(),
            }),
            ApiReply::Text(body) => Err(Error::Deserialization {
                message: "getAccount: expected a JSON object".into(),
                body,
            }),
        }
    }

    /// Pushy device token of the first registered phone, paired with the
    /// app auth key. `None` when the account cannot be fetched or has no
    /// usable token.
    pub async fn get_pushy_credentials(&self) -> Option<PushCredentials> {
        let account = match self.get_account().await {
            Ok(account) => account,
            Err(e) => {
                debug!(error = %e, "no push credentials: account fetch failed");
                return None;
            }
        };

        let token = account
            .phone_list
            .first()
            .and_then(|phone| phone.token.clone())
            .filter(|token| !token.is_empty())?;

        Some(PushCredentials {
            token,
            auth: SecretString::from(PUSHY_APP_AUTH),
        })
    }

    /// Tell the vendor the "app" came to the foreground. Returns the raw
    /// reply; callers treat this as best-effort.
    pub async fn resume_app(&self, app: &AppInfo) -> Result<ApiReply, Error> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let body = object(json!({
            "phoneInfo": app.phone_info,
            "phoneOS": app.phone_os,
            "appVersion": app.app_version,
            "locationLat": -1,
            "locationLong": -1,
            "locationCountry": "",
            "locationCity": "",
            "locationDistrict": "",
            "locationFindType": "",
            "locationLastUpdateTime": now_ms.to_string(),
            "pushyToken": "",
            "pushKitToken": "",
        }));

        let reply = self.post(Endpoint::ResumeApp, body).await?;
        debug!(%reply, "resumeApp");
        Ok(reply)
    }
}
