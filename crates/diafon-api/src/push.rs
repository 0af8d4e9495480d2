//! Pushy long-poll listener.
//!
//! Authenticates a device token with the Pushy service, subscribes it to a
//! set of topics, and long-polls `/devices/listen` in a background task.
//! Every message carrying a `notification` is broadcast to subscribers
//! through a [`tokio::sync::broadcast`] channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use diafon_api::push::{PushClient, PushConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let push = PushClient::new(http, PushConfig::default(), credentials, CancellationToken::new());
//! let mut rx = push.subscribe();
//! push.connect(vec!["location_42".into()]).await?;
//!
//! while let Ok(notification) = rx.recv().await {
//!     println!("{}", notification.data);
//! }
//!
//! push.disconnect().await;
//! ```
//!
//! The wire protocol is experimental: the endpoints mirror Pushy's public
//! device API, the topic names are whatever the caller subscribes to.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::models::PushCredentials;
use crate::transport::DEFAULT_PUSH_URL;

// ── Broadcast channel capacity ───────────────────────────────────────

const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

// ── PushState ────────────────────────────────────────────────────────

/// Lifecycle of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    Disconnected,
    Authenticated,
    Subscribed,
    Listening,
}

impl std::fmt::Display for PushState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Authenticated => "authenticated",
            Self::Subscribed => "subscribed",
            Self::Listening => "listening",
        })
    }
}

// ── PushNotification ─────────────────────────────────────────────────

/// A notification delivered by the long-poll.
///
/// `data` is the application payload; everything else Pushy sends is kept
/// in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushNotification {
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// ── PushConfig ───────────────────────────────────────────────────────

/// Endpoint and timing configuration for the listener.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Pushy API root. Default: `https://api.pushy.me`.
    pub base_url: Url,

    /// Upper bound on one long-poll request. Default: 60s.
    pub listen_timeout: Duration,

    /// Pause after a non-200 listen response. Default: 5s.
    pub status_backoff: Duration,

    /// Pause after any other listen failure. Default: 10s.
    pub error_backoff: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PUSH_URL.clone(),
            listen_timeout: Duration::from_secs(60),
            status_backoff: Duration::from_secs(5),
            error_backoff: Duration::from_secs(10),
        }
    }
}

// ── Shared state ─────────────────────────────────────────────────────

struct Shared {
    http: reqwest::Client,
    config: PushConfig,
    credentials: PushCredentials,
    state: watch::Sender<PushState>,
    notify_tx: broadcast::Sender<Arc<PushNotification>>,
}

impl Shared {
    fn url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path
        );
        Ok(Url::parse(&full)?)
    }

    fn set_state(&self, state: PushState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "push state");
        }
    }

    /// POST a device request and require `200` with `success: true`.
    async fn device_call(&self, path: &str, body: Value) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);

        let resp = self.http.post(url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status != StatusCode::OK {
            return Err(Error::Push(format!("{path}: HTTP {status}: {text}")));
        }

        let success = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("success").and_then(Value::as_bool))
            .unwrap_or(false);

        if success {
            Ok(())
        } else {
            Err(Error::Push(format!("{path} rejected: {text}")))
        }
    }

    fn device_body(&self) -> Value {
        json!({
            "auth": self.credentials.auth.expose_secret(),
            "token": self.credentials.token,
        })
    }

    fn topics_body(&self, topics: &[String]) -> Value {
        json!({
            "token": self.credentials.token,
            "auth": self.credentials.auth.expose_secret(),
            "topics": topics,
        })
    }
}

// ── PushClient ───────────────────────────────────────────────────────

/// Handle to a Pushy device session.
///
/// One connect/disconnect cycle per instance: `disconnect` cancels the
/// token the client was built with.
pub struct PushClient {
    shared: Arc<Shared>,
    topics: Mutex<Vec<String>>,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl PushClient {
    pub fn new(
        http: reqwest::Client,
        config: PushConfig,
        credentials: PushCredentials,
        cancel: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(PushState::Disconnected);
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                http,
                config,
                credentials,
                state,
                notify_tx,
            }),
            topics: Mutex::new(Vec::new()),
            cancel,
            listener: Mutex::new(None),
        }
    }

    /// Receive every notification delivered after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushNotification>> {
        self.shared.notify_tx.subscribe()
    }

    pub fn state(&self) -> PushState {
        *self.shared.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<PushState> {
        self.shared.state.subscribe()
    }

    /// `true` once subscribed, until `disconnect`.
    pub fn is_connected(&self) -> bool {
        matches!(self.state(), PushState::Subscribed | PushState::Listening)
    }

    pub async fn topics(&self) -> Vec<String> {
        self.topics.lock().await.clone()
    }

    // ── Device API ───────────────────────────────────────────────────

    pub async fn authenticate(&self) -> Result<(), Error> {
        self.shared
            .device_call("devices/auth", self.shared.device_body())
            .await?;
        info!("push device authenticated");
        self.shared.set_state(PushState::Authenticated);
        Ok(())
    }

    pub async fn subscribe_topics(&self, topics: &[String]) -> Result<(), Error> {
        self.shared
            .device_call("devices/subscribe", self.shared.topics_body(topics))
            .await?;
        info!(?topics, "subscribed to push topics");
        self.shared.set_state(PushState::Subscribed);
        Ok(())
    }

    pub async fn unsubscribe_topics(&self, topics: &[String]) -> Result<(), Error> {
        self.shared
            .device_call("devices/unsubscribe", self.shared.topics_body(topics))
            .await?;
        info!(?topics, "unsubscribed from push topics");
        Ok(())
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Authenticate, subscribe, and start the long-poll task.
    pub async fn connect(&self, topics: Vec<String>) -> Result<(), Error> {
        self.authenticate().await?;
        self.subscribe_topics(&topics).await?;
        *self.topics.lock().await = topics;

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            listen_loop(shared, cancel).await;
        });
        *self.listener.lock().await = Some(handle);

        Ok(())
    }

    /// Stop the long-poll, wait for it, and unsubscribe (best-effort).
    pub async fn disconnect(&self) {
        self.cancel.cancel();

        let listener = self.listener.lock().await.take();
        if let Some(handle) = listener {
            if let Err(e) = handle.await {
                warn!(error = %e, "push listener task panicked");
            }
        }

        let topics = std::mem::take(&mut *self.topics.lock().await);
        if !topics.is_empty() {
            if let Err(e) = self.unsubscribe_topics(&topics).await {
                warn!(error = %e, "push unsubscribe failed");
            }
        }

        self.shared.set_state(PushState::Disconnected);
        info!("push client disconnected");
    }
}

// ── Background long-poll loop ────────────────────────────────────────

/// Result of one long-poll round.
enum Poll {
    Notification(PushNotification),
    Empty,
    Rejected(StatusCode),
}

async fn listen_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    shared.set_state(PushState::Listening);
    info!("push listener started");

    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = poll_once(&shared) => outcome,
        };

        let delay = match outcome {
            Ok(Poll::Notification(notification)) => {
                info!(data = %notification.data, "push notification received");
                // No receivers just means nobody is listening right now.
                let _ = shared.notify_tx.send(Arc::new(notification));
                None
            }
            Ok(Poll::Empty) => None,
            Ok(Poll::Rejected(status)) => {
                debug!(%status, "push listen rejected, backing off");
                Some(shared.config.status_backoff)
            }
            Err(e) if e.is_timeout() => {
                debug!("push listen timed out, polling again");
                None
            }
            Err(e) => {
                warn!(error = %e, "push listen error");
                Some(shared.config.error_backoff)
            }
        };

        if let Some(delay) = delay {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    debug!("push listen loop exiting");
}

async fn poll_once(shared: &Shared) -> Result<Poll, Error> {
    let url = shared.url("devices/listen")?;

    let resp = shared
        .http
        .post(url)
        .timeout(shared.config.listen_timeout)
        .json(&shared.device_body())
        .send()
        .await?;

    let status = resp.status();
    if status != StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        debug!(%status, body, "push listen response");
        return Ok(Poll::Rejected(status));
    }

    let body: Value = resp.json().await?;
    match body.get("notification") {
        Some(notification @ Value::Object(fields)) if !fields.is_empty() => {
            let parsed = serde_json::from_value(notification.clone()).map_err(|e| {
                Error::Deserialization {
                    message: format!("push notification: {e}"),
                    body: notification.to_string(),
                }
            })?;
            Ok(Poll::Notification(parsed))
        }
        _ => Ok(Poll::Empty),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_push_config() {
        let config = PushConfig::default();
        assert_eq!(config.base_url.as_str(), "https://api.pushy.me/");
        assert_eq!(config.listen_timeout, Duration::from_secs(60));
        assert_eq!(config.status_backoff, Duration::from_secs(5));
        assert_eq!(config.error_backoff, Duration::from_secs(10));
    }

    #[test]
    fn state_display() {
        assert_eq!(PushState::Disconnected.to_string(), "disconnected");
        assert_eq!(PushState::Listening.to_string(), "listening");
    }

    #[test]
    fn notification_keeps_unknown_fields() {
        let n: PushNotification = serde_json::from_value(json!({
            "data": {"call_id": "x"},
            "topic": "location_1"
        }))
        .unwrap_or_default();
        assert_eq!(n.data["call_id"], "x");
        assert_eq!(n.extra["topic"], "location_1");
    }
}
