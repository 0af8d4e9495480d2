// ── Refresh coordinator ──
//
// Full lifecycle management for one DiafonBox account: login, periodic
// and on-demand refresh, doorbell ring detection, the door-open
// strategy, and the optional push listener.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use diafon_api::push::{PushClient, PushConfig, PushNotification};
use diafon_api::transport::{TlsMode, TransportConfig};
use diafon_api::{CallRecord, Device, Identity, MultitekClient, PushState};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CoordinatorConfig, TlsVerification};
use crate::entity::ProjectionContext;
use crate::error::CoreError;
use crate::events::{DomainEvent, DoorOpened, DoorbellPressed};
use crate::store::{DataStore, Snapshot};
use crate::stream::SnapshotStream;
use crate::topics::push_topics;
use crate::unlock::{DoorTarget, UnlockMethod, UnlockOutcome};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. A coordinator runs one
/// connect/shutdown cycle; build a new one to reconnect.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    client: MultitekClient,
    store: Arc<DataStore>,
    connection_state: watch::Sender<ConnectionState>,
    event_tx: broadcast::Sender<Arc<DomainEvent>>,
    // Capacity 1: a pending request absorbs any further ones.
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: Mutex<Option<mpsc::Receiver<()>>>,
    refresh_lock: Mutex<()>,
    seen_call_ids: DashSet<String>,
    push: Mutex<Option<Arc<PushClient>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator and its HTTP client. Does NOT connect --
    /// call [`connect()`](Self::connect) to log in and start background
    /// tasks.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);

        let mut identity = Identity::new(config.email.clone(), config.phone_id.clone());
        if let Some(ref password) = config.password {
            identity = identity.with_password(password.clone());
        }

        let mut client = MultitekClient::new(config.api_url.clone(), identity, &transport)?;
        if let Some(ref image_url) = config.image_url {
            client = client.with_image_base_url(image_url.clone());
        }

        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (refresh_tx, refresh_rx) = mpsc::channel(1);

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                client,
                store: Arc::new(DataStore::new()),
                connection_state,
                event_tx,
                refresh_tx,
                refresh_rx: Mutex::new(Some(refresh_rx)),
                refresh_lock: Mutex::new(()),
                seen_call_ids: DashSet::new(),
                push: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &MultitekClient {
        &self.inner.client
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in, run the first refresh, start the refresh task, then try
    /// to set up push.
    ///
    /// Login failure or a failed first refresh marks the coordinator
    /// [`Failed`](ConnectionState::Failed) and returns the error. Push
    /// problems only downgrade to polling.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let client = &self.inner.client;

        if let Err(e) = client.login().await {
            if e.is_authentication() {
                warn!(email = %self.inner.config.email, "credentials rejected");
            } else {
                warn!(error = %e, "login failed");
            }
            self.inner
                .connection_state
                .send_replace(ConnectionState::Failed);
            return Err(e.into());
        }

        if let Err(e) = client.resume_app(&self.inner.config.app).await {
            debug!(error = %e, "resumeApp failed (non-fatal)");
        }

        if let Err(e) = self.refresh().await {
            self.inner
                .connection_state
                .send_replace(ConnectionState::Failed);
            return Err(e);
        }

        if let Some(rx) = self.inner.refresh_rx.lock().await.take() {
            let coordinator = self.clone();
            let interval_secs = self.inner.config.scan_interval_secs;
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(coordinator, rx, interval_secs, cancel)));
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connected);
        info!(email = %self.inner.config.email, "coordinator connected");

        if self.inner.config.push_enabled {
            self.setup_push().await;
        }

        Ok(())
    }

    /// Cancel and join background tasks, then disconnect push.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task panicked");
            }
        }

        let push = self.inner.push.lock().await.take();
        if let Some(push) = push {
            push.disconnect().await;
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("coordinator shut down");
    }

    /// One-shot: connect, run closure, shut down.
    ///
    /// Disables push and periodic refresh since the CLI only needs a
    /// single request-response cycle.
    pub async fn oneshot<F, Fut, T>(config: CoordinatorConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.push_enabled = false;
        cfg.scan_interval_secs = 0;

        let coordinator = Coordinator::new(cfg)?;
        coordinator.connect().await?;
        let result = f(coordinator.clone()).await;
        coordinator.shutdown().await;
        result
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Fetch locations, call records and account as one unit.
    ///
    /// On failure the previous snapshot is kept and
    /// `last_update_success` becomes false. On success, unseen `Missed`
    /// calls are published as [`DoorbellPressed`] before the snapshot is
    /// replaced.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let _guard = self.inner.refresh_lock.lock().await;
        let client = &self.inner.client;

        let fetched = tokio::try_join!(
            client.get_locations(),
            client.get_call_records(),
            client.get_account(),
        );

        let (locations, call_records, account) = match fetched {
            Ok(data) => data,
            Err(e) => {
                self.inner.store.mark_failed();
                warn!(error = %e, "refresh failed, keeping previous data");
                return Err(e.into());
            }
        };

        for ring in self.detect_new_rings(&call_records) {
            info!(
                call_from = %ring.call_from,
                call_to = %ring.call_to,
                location_id = %ring.location_id,
                "doorbell pressed"
            );
            self.publish(DomainEvent::DoorbellPressed(ring));
        }

        let snapshot = self
            .inner
            .store
            .apply(Snapshot::new(locations, call_records, account));

        debug!(
            locations = snapshot.locations.len(),
            calls = snapshot.call_records.len(),
            "refresh complete"
        );
        Ok(())
    }

    /// Ask the refresh task for an out-of-band refresh. Requests made
    /// while one is already pending are absorbed.
    pub fn request_refresh(&self) {
        match self.inner.refresh_tx.try_send(()) {
            Ok(()) => debug!("refresh requested"),
            Err(mpsc::error::TrySendError::Full(())) => debug!("refresh already pending"),
            Err(mpsc::error::TrySendError::Closed(())) => debug!("refresh task gone"),
        }
    }

    /// Record unseen `Missed` calls and return one ring per new id.
    fn detect_new_rings(&self, call_records: &[CallRecord]) -> Vec<DoorbellPressed> {
        call_records
            .iter()
            .filter(|call| call.is_missed())
            .filter(|call| self.inner.seen_call_ids.insert(call.call_id.clone()))
            .map(DoorbellPressed::from)
            .collect()
    }

    fn publish(&self, event: DomainEvent) {
        // No receivers is fine -- nobody is watching right now.
        let _ = self.inner.event_tx.send(Arc::new(event));
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.store.snapshot()
    }

    /// Calls within `window` of now, optionally to one destination.
    pub fn get_recent_calls(&self, call_to: Option<&str>, window: Duration) -> Vec<CallRecord> {
        let now_ms = Utc::now().timestamp_millis();
        self.snapshot().map_or_else(Vec::new, |snap| {
            snap.recent_calls(call_to, window, now_ms)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Calls, in any state, since local midnight.
    pub fn get_today_call_count(&self) -> usize {
        let ctx = ProjectionContext::now();
        self.snapshot()
            .map_or(0, |snap| snap.count_since(ctx.midnight_ms))
    }

    pub fn get_device_by_location(&self, location_id: &str) -> Option<Device> {
        self.snapshot()
            .and_then(|snap| snap.device_by_location(location_id).cloned())
    }

    /// Resolve the door unit for an open-door request: the named
    /// location, or the first location that has a device.
    pub fn resolve_target(&self, location_id: Option<&str>) -> Result<DoorTarget, CoreError> {
        let snap = self.snapshot().ok_or(CoreError::NoData)?;

        let location = match location_id {
            Some(id) => snap
                .location(id)
                .ok_or_else(|| CoreError::LocationNotFound {
                    location_id: id.to_owned(),
                })?,
            None => snap
                .locations
                .iter()
                .find(|l| l.device().is_some())
                .ok_or_else(|| CoreError::NoDoorDevice {
                    location: "any location".into(),
                })?,
        };

        let device = location
            .device()
            .cloned()
            .ok_or_else(|| CoreError::NoDoorDevice {
                location: location.location_id.clone(),
            })?;

        Ok(DoorTarget {
            location_id: location.location_id.clone(),
            location_name: location.location_name.clone(),
            device,
        })
    }

    /// Ids that already produced a ring event, sorted.
    pub fn seen_call_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .seen_call_ids
            .iter()
            .map(|id| id.key().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.store.last_update_success()
    }

    // ── Actions ──────────────────────────────────────────────────

    /// Run the door-open strategy against `target`.
    ///
    /// On success publishes [`DoorOpened`] and requests a refresh. Never
    /// returns an error; failures come back as
    /// [`UnlockOutcome::Failed`].
    pub async fn open_door(&self, target: &DoorTarget) -> UnlockOutcome {
        info!(
            location = %target.location_name,
            sip = %target.device.sip,
            "opening door"
        );

        let outcome = self.run_door_strategy(target).await;

        match &outcome {
            UnlockOutcome::Opened { method, call_id } => {
                info!(location = %target.location_name, %method, "door opened");
                self.publish(DomainEvent::DoorOpened(DoorOpened {
                    location_id: target.location_id.clone(),
                    location_name: target.location_name.clone(),
                    device_sip: target.device.sip.clone(),
                    method: *method,
                    call_id: call_id.clone(),
                }));
                self.request_refresh();
            }
            UnlockOutcome::Failed { reason } => {
                error!(location = %target.location_name, reason, "failed to open door");
            }
        }

        outcome
    }

    async fn run_door_strategy(&self, target: &DoorTarget) -> UnlockOutcome {
        let client = &self.inner.client;

        if let Some(call) = client.ask_current_call().await {
            match client.open_door_with_call(&call.call_id).await {
                Ok(true) => {
                    return UnlockOutcome::Opened {
                        method: UnlockMethod::ControlCurrentCall,
                        call_id: Some(call.call_id),
                    };
                }
                Ok(false) => warn!("controlCurrentCall failed, trying addCall"),
                Err(e) => warn!(error = %e, "controlCurrentCall errored, trying addCall"),
            }
        }

        match client
            .open_door(&target.device.sip, &target.location_id)
            .await
        {
            Ok(true) => UnlockOutcome::Opened {
                method: UnlockMethod::AddCall,
                call_id: None,
            },
            Ok(false) => UnlockOutcome::Failed {
                reason: "door unit did not confirm the call".into(),
            },
            Err(e) => UnlockOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Download a ring snapshot by its server path.
    pub async fn fetch_snapshot(&self, path: &str) -> Result<Bytes, CoreError> {
        Ok(self.inner.client.fetch_snapshot(path).await?)
    }

    // ── Push ─────────────────────────────────────────────────────

    /// Best-effort push setup. Any failure leaves the coordinator in
    /// polling-only mode.
    async fn setup_push(&self) {
        let client = &self.inner.client;

        let Some(credentials) = client.get_pushy_credentials().await else {
            info!("no push credentials on account, polling only");
            return;
        };

        let topics = self
            .snapshot()
            .map(|snap| push_topics(&snap.locations))
            .unwrap_or_default();

        let push = Arc::new(PushClient::new(
            client.http().clone(),
            PushConfig {
                base_url: self.inner.config.push_url.clone(),
                ..PushConfig::default()
            },
            credentials,
            self.inner.cancel.child_token(),
        ));

        let rx = push.subscribe();
        if let Err(e) = push.connect(topics).await {
            warn!(error = %e, "push setup failed, polling only");
            return;
        }

        let coordinator = self.clone();
        let cancel = self.inner.cancel.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(push_forwarder_task(coordinator, rx, cancel)));

        *self.inner.push.lock().await = Some(push);
        info!("push listener active");
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to domain events.
    pub fn events(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.inner.event_tx.subscribe()
    }

    /// Subscribe to snapshot replacements.
    pub fn snapshots(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    /// Push listener state, or `None` when push is not running.
    pub async fn push_state(&self) -> Option<PushState> {
        self.inner.push.lock().await.as_ref().map(|p| p.state())
    }

    /// Push lifecycle transitions, while a listener is attached.
    pub async fn push_state_changes(&self) -> Option<watch::Receiver<PushState>> {
        self.inner
            .push
            .lock()
            .await
            .as_ref()
            .map(|p| p.state_changes())
    }

    /// Fires after every refresh with its success flag.
    pub fn refresh_results(&self) -> watch::Receiver<bool> {
        self.inner.store.subscribe_update_success()
    }

    /// When the cached snapshot was fetched.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.store.last_refresh()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Refresh on the timer and whenever a refresh is requested.
async fn refresh_task(
    coordinator: Coordinator,
    mut requests: mpsc::Receiver<()>,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    let mut interval = (interval_secs > 0).then(|| {
        tokio::time::interval_at(
            tokio::time::Instant::now() + Duration::from_secs(interval_secs),
            Duration::from_secs(interval_secs),
        )
    });

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            request = requests.recv() => {
                if request.is_none() {
                    break;
                }
                if let Err(e) = coordinator.refresh().await {
                    warn!(error = %e, "requested refresh failed");
                }
            }
            () = next_tick(interval.as_mut()) => {
                if let Err(e) = coordinator.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }

    debug!("refresh task exiting");
}

async fn next_tick(interval: Option<&mut tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Turn push notifications into refresh requests.
async fn push_forwarder_task(
    coordinator: Coordinator,
    mut rx: broadcast::Receiver<Arc<PushNotification>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Ok(notification) => {
                    debug!(data = %notification.data, "push notification, refreshing");
                    coordinator.request_refresh();
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "push forwarder lagged");
                    coordinator.request_refresh();
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Build a [`TransportConfig`] from the coordinator configuration.
fn build_transport(config: &CoordinatorConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn coordinator() -> Coordinator {
        Coordinator::new(CoordinatorConfig::new("a@b.c", "PHONE")).unwrap()
    }

    fn missed(id: &str) -> CallRecord {
        serde_json::from_value(json!({
            "call_id": id, "call_state": "Missed", "date": "1000", "location_id": "L1"
        }))
        .unwrap()
    }

    #[test]
    fn seen_ids_start_empty() {
        assert!(coordinator().seen_call_ids().is_empty());
    }

    #[test]
    fn same_call_rings_once() {
        let c = coordinator();
        let batch = vec![missed("a"), missed("b")];

        assert_eq!(c.detect_new_rings(&batch).len(), 2);
        assert!(c.detect_new_rings(&batch).is_empty());
        assert_eq!(c.seen_call_ids(), vec!["a", "b"]);
    }

    #[test]
    fn outgoing_calls_never_ring() {
        let c = coordinator();
        let outgoing: CallRecord = serde_json::from_value(json!({
            "call_id": "o", "call_state": "Outgoing", "date": "1000"
        }))
        .unwrap();
        assert!(c.detect_new_rings(&[outgoing]).is_empty());
        assert!(c.seen_call_ids().is_empty());
    }

    #[test]
    fn queries_on_empty_cache() {
        let c = coordinator();
        assert!(c.get_recent_calls(None, Duration::from_secs(60)).is_empty());
        assert_eq!(c.get_today_call_count(), 0);
        assert!(c.get_device_by_location("L1").is_none());
        assert!(matches!(c.resolve_target(None), Err(CoreError::NoData)));
    }

    #[test]
    fn request_refresh_coalesces() {
        let c = coordinator();
        c.request_refresh();
        c.request_refresh();
        c.request_refresh();
        assert_eq!(c.inner.refresh_tx.capacity(), 0);
    }
}
