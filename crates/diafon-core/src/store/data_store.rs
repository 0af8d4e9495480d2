// ── Central snapshot store ──
//
// Holds the last good snapshot behind an `ArcSwapOption` for wait-free
// reads and publishes every replacement on a `watch` channel.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::Snapshot;
use crate::stream::SnapshotStream;

/// Reactive store for the coordinator's cached data.
///
/// A failed refresh never touches the snapshot; it only flips
/// `last_update_success`.
pub struct DataStore {
    current: ArcSwapOption<Snapshot>,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>,
    last_update_success: watch::Sender<bool>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (last_update_success, _) = watch::channel(false);
        let (last_refresh, _) = watch::channel(None);

        Self {
            current: ArcSwapOption::empty(),
            snapshot_tx,
            last_update_success,
            last_refresh,
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Replace the snapshot and notify subscribers.
    pub fn apply(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let refreshed_at = snapshot.refreshed_at;
        let snapshot = Arc::new(snapshot);

        self.current.store(Some(Arc::clone(&snapshot)));
        self.snapshot_tx.send_replace(Some(Arc::clone(&snapshot)));
        self.last_update_success.send_replace(true);
        self.last_refresh.send_replace(Some(refreshed_at));

        snapshot
    }

    /// Record a failed refresh; the previous snapshot stays.
    pub fn mark_failed(&self) {
        self.last_update_success.send_replace(false);
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn last_update_success(&self) -> bool {
        *self.last_update_success.borrow()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.snapshot_tx.subscribe())
    }

    pub fn subscribe_update_success(&self) -> watch::Receiver<bool> {
        self.last_update_success.subscribe()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use diafon_api::Account;

    use super::*;

    #[test]
    fn starts_empty() {
        let store = DataStore::new();
        assert!(store.snapshot().is_none());
        assert!(!store.last_update_success());
        assert!(store.last_refresh().is_none());
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let store = DataStore::new();
        store.apply(Snapshot::new(Vec::new(), Vec::new(), Account::default()));
        assert!(store.last_update_success());

        store.mark_failed();
        assert!(store.snapshot().is_some());
        assert!(!store.last_update_success());
    }

    #[tokio::test]
    async fn subscribers_see_replacements() {
        let store = DataStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_none());

        store.apply(Snapshot::new(Vec::new(), Vec::new(), Account::default()));
        let next = stream.changed().await.unwrap();
        assert!(next.is_some());
    }
}
