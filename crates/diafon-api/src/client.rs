// Vendor API HTTP client
//
// Wraps `reqwest::Client` with the DiafonBox request conventions: every
// call is a JSON POST to `{base}/{endpoint}` carrying the caller identity
// and the shared service Basic credential. Endpoint operations (account,
// locations, calls, media) are implemented as inherent methods in sibling
// modules to keep this one focused on transport mechanics.

use std::sync::RwLock;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::{ServiceCredentials, TransportConfig};

/// Language tag the vendor app sends with every request.
pub const DEFAULT_LANGUAGE: &str = "tr-TR";

/// Marker the vendor returns for a successful write.
const SUCCESS_MARKER: &str = "1";

// ── Endpoints ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    UserAccountControl,
    GetUserLocations,
    GetCallAllRecords,
    AddCall,
    SetCallDuration,
    GetAccount,
    ResumeApp,
    AskCurrentCall,
    ControlCurrentCall,
}

impl Endpoint {
    pub(crate) const fn path(self) -> &'static str {
        match self {
            Self::UserAccountControl => "userAccountControl",
            Self::GetUserLocations => "getUserLocations",
            Self::GetCallAllRecords => "getCallAllRecords",
            Self::AddCall => "addCall",
            Self::SetCallDuration => "setCallDuration",
            Self::GetAccount => "getAccount",
            Self::ResumeApp => "resumeApp",
            Self::AskCurrentCall => "askCurrentCall",
            Self::ControlCurrentCall => "controlCurrentCall",
        }
    }
}

// ── Identity ─────────────────────────────────────────────────────────

/// Who is calling: the account email, the registered phone id, and an
/// optional password for accounts that own (rather than were invited to)
/// their locations.
#[derive(Debug, Clone)]
pub struct Identity {
    pub email: String,
    pub phone_id: String,
    pub language: String,
    pub password: Option<SecretString>,
}

impl Identity {
    pub fn new(email: impl Into<String>, phone_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone_id: phone_id.into(),
            language: DEFAULT_LANGUAGE.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }
}

// ── Replies ──────────────────────────────────────────────────────────

/// A decoded vendor response: JSON when the server says so, raw text
/// otherwise (write endpoints answer with a bare `1` or `0`).
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    Json(Value),
    Text(String),
}

impl ApiReply {
    /// `true` only for the literal success marker: text or JSON string
    /// `"1"`, or the JSON number `1`.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Text(text) => text == SUCCESS_MARKER,
            Self::Json(Value::String(s)) => s == SUCCESS_MARKER,
            Self::Json(Value::Number(n)) => n.as_i64() == Some(1),
            Self::Json(_) => false,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for ApiReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "{text:?}"),
        }
    }
}

/// Turn a `json!({...})` literal into a request body map.
pub(crate) fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// HTTP client for the DiafonBox cloud.
///
/// Caches the account SIP address after login so door-open calls do not
/// need an extra account fetch.
pub struct MultitekClient {
    http: reqwest::Client,
    base_url: Url,
    image_base_url: Url,
    service: ServiceCredentials,
    identity: Identity,
    user_sip: RwLock<Option<String>>,
}

impl MultitekClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the service root, e.g.
    /// `https://cloud.multitek.com.tr:8096/multitek_service/root`.
    pub fn new(base_url: Url, identity: Identity, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, identity))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, identity: Identity) -> Self {
        let image_base_url = origin_of(&base_url);
        Self {
            http,
            base_url,
            image_base_url,
            service: ServiceCredentials::default(),
            identity,
            user_sip: RwLock::new(None),
        }
    }

    /// Override the root that snapshot paths are resolved against.
    /// Defaults to the scheme, host and port of the service root.
    pub fn with_image_base_url(mut self, url: Url) -> Self {
        self.image_base_url = url;
        self
    }

    /// Override the shared service credential.
    pub fn with_service_credentials(mut self, service: ServiceCredentials) -> Self {
        self.service = service;
        self
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn image_base_url(&self) -> &Url {
        &self.image_base_url
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The account SIP address cached by `login` or `open_door`.
    pub fn user_sip(&self) -> Option<String> {
        self.user_sip.read().ok().and_then(|sip| sip.clone())
    }

    pub(crate) fn cache_user_sip(&self, sip: Option<String>) {
        if let Ok(mut slot) = self.user_sip.write() {
            *slot = sip;
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.path()
        );
        Ok(Url::parse(&full)?)
    }

    /// Resolve a server-side media path against the image root.
    pub(crate) fn media_url(&self, path: &str) -> Result<Url, Error> {
        let root = self.image_base_url.as_str().trim_end_matches('/');
        let full = if path.starts_with('/') {
            format!("{root}{path}")
        } else {
            format!("{root}/{path}")
        };
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// POST a JSON body to a vendor endpoint.
    ///
    /// `email`, `phone_id` and `language` are filled in unless the body
    /// already carries them.
    pub(crate) async fn post(
        &self,
        endpoint: Endpoint,
        mut body: Map<String, Value>,
    ) -> Result<ApiReply, Error> {
        let url = self.endpoint_url(endpoint)?;

        body.entry("email")
            .or_insert_with(|| Value::String(self.identity.email.clone()));
        body.entry("phone_id")
            .or_insert_with(|| Value::String(self.identity.phone_id.clone()));
        body.entry("language")
            .or_insert_with(|| Value::String(self.identity.language.clone()));

        debug!(endpoint = endpoint.path(), "POST {}", url);

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.service.username, Some(self.service.password.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_reply(endpoint.path(), resp).await
    }

    /// GET raw bytes with the service credential.
    pub(crate) async fn get_bytes(&self, url: Url) -> Result<bytes::Bytes, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .basic_auth(&self.service.username, Some(self.service.password.expose_secret()))
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "service credential rejected".into(),
            });
        }
        if status != StatusCode::OK {
            return Err(Error::Status {
                status: status.as_u16(),
                endpoint: url.path().to_owned(),
            });
        }

        resp.bytes().await.map_err(Error::Transport)
    }
}

/// Map the HTTP response to an [`ApiReply`]: 401 is an authentication
/// error, any other non-200 an API error.
async fn parse_reply(endpoint: &str, resp: reqwest::Response) -> Result<ApiReply, Error> {
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: format!("{endpoint} rejected the request (HTTP 401)"),
        });
    }
    if status != StatusCode::OK {
        return Err(Error::Status {
            status: status.as_u16(),
            endpoint: endpoint.to_owned(),
        });
    }

    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let body = resp.text().await.map_err(Error::Transport)?;

    if is_json {
        serde_json::from_str(&body)
            .map(ApiReply::Json)
            .map_err(|e| Error::Deserialization {
                message: format!("{endpoint}: {e}"),
                body,
            })
    } else {
        Ok(ApiReply::Text(body))
    }
}

/// Decode a list endpoint leniently: a non-list reply is an empty list and
/// malformed entries are skipped.
pub(crate) fn decode_list<T: DeserializeOwned>(endpoint: Endpoint, reply: ApiReply) -> Vec<T> {
    let items = match reply {
        ApiReply::Json(Value::Array(items)) => items,
        other => {
            debug!(endpoint = endpoint.path(), reply = %other, "non-list reply, treating as empty");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(endpoint = endpoint.path(), error = %e, "skipping malformed entry");
                None
            }
        })
        .collect()
}

/// Scheme, host and port of `url`, with an empty path.
fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> MultitekClient {
        MultitekClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://cloud.example:8096/multitek_service/root").unwrap(),
            Identity::new("a@b.c", "PHONE"),
        )
    }

    #[test]
    fn success_marker_variants() {
        assert!(ApiReply::Text("1".into()).is_success());
        assert!(ApiReply::Json(json!("1")).is_success());
        assert!(ApiReply::Json(json!(1)).is_success());
        assert!(!ApiReply::Text("0".into()).is_success());
        assert!(!ApiReply::Text("1\n".into()).is_success());
        assert!(!ApiReply::Json(json!({"result": 1})).is_success());
        assert!(!ApiReply::Json(json!(true)).is_success());
    }

    #[test]
    fn endpoint_urls_append_to_root() {
        let c = client();
        assert_eq!(
            c.endpoint_url(Endpoint::GetAccount).unwrap().as_str(),
            "https://cloud.example:8096/multitek_service/root/getAccount"
        );
    }

    #[test]
    fn media_urls_resolve_against_origin() {
        let c = client();
        assert_eq!(c.image_base_url().as_str(), "https://cloud.example:8096/");
        assert_eq!(
            c.media_url("/files/snap.jpg").unwrap().as_str(),
            "https://cloud.example:8096/files/snap.jpg"
        );
        assert_eq!(
            c.media_url("files/snap.jpg").unwrap().as_str(),
            "https://cloud.example:8096/files/snap.jpg"
        );
    }

    #[test]
    fn identity_defaults_language() {
        let identity = Identity::new("a@b.c", "X");
        assert_eq!(identity.language, "tr-TR");
        assert!(identity.password.is_none());
    }
}
