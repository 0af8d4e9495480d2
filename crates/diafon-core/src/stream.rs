// ── Reactive snapshot stream ──
//
// Subscription type for consuming snapshot replacements from the
// DataStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::Snapshot;

type SnapshotSlot = Option<Arc<Snapshot>>;

/// A subscription to the coordinator's snapshot.
///
/// Provides point-in-time access and change notification via
/// `changed()` or by converting to a `Stream`.
pub struct SnapshotStream {
    current: SnapshotSlot,
    receiver: watch::Receiver<SnapshotSlot>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<SnapshotSlot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time (or at the last `changed`).
    pub fn current(&self) -> Option<&Arc<Snapshot>> {
        self.current.as_ref()
    }

    /// The latest snapshot.
    pub fn latest(&self) -> SnapshotSlot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next replacement. Returns `None` once the store is
    /// dropped.
    pub async fn changed(&mut self) -> Option<SnapshotSlot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current.clone_from(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`. Yields the current
/// value first, then every replacement.
pub struct SnapshotWatchStream {
    inner: WatchStream<SnapshotSlot>,
}

impl Stream for SnapshotWatchStream {
    type Item = SnapshotSlot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
