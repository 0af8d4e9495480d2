use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use diafon_api::{CallRecord, Location};
use tracing::{debug, warn};

use super::{Entity, EntityKind, EntityState, ProjectionContext, StateValue, unique_id};
use crate::coordinator::Coordinator;
use crate::store::Snapshot;

/// Shows the snapshot of the location's latest ring.
pub struct SnapshotCamera {
    unique_id: String,
    name: String,
    location_id: String,
    last_image: ArcSwapOption<Bytes>,
}

impl SnapshotCamera {
    pub fn new(location: &Location) -> Self {
        Self {
            unique_id: unique_id(&location.location_id, "camera"),
            name: format!("{} Camera", location.location_name),
            location_id: location.location_id.clone(),
            last_image: ArcSwapOption::empty(),
        }
    }

    /// Latest missed call of this location that carries a snapshot.
    pub fn latest_snapshot<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a CallRecord> {
        snapshot.latest_missed(|c| {
            c.location_id == self.location_id && c.snapshot_path().is_some()
        })
    }

    /// Current image. Falls back to the last good image when there is no
    /// snapshot yet or the download fails.
    pub async fn image(&self, coordinator: &Coordinator) -> Option<Bytes> {
        let path = coordinator.snapshot().and_then(|snap| {
            self.latest_snapshot(&snap)
                .and_then(CallRecord::snapshot_path)
                .map(str::to_owned)
        });

        let Some(path) = path else {
            debug!(location_id = %self.location_id, "no ring snapshot yet");
            return self.cached_image();
        };

        match coordinator.fetch_snapshot(&path).await {
            Ok(image) => {
                self.last_image.store(Some(Arc::new(image.clone())));
                Some(image)
            }
            Err(e) => {
                warn!(error = %e, %path, "snapshot download failed, serving cached image");
                self.cached_image()
            }
        }
    }

    pub fn cached_image(&self) -> Option<Bytes> {
        self.last_image.load_full().map(|image| (*image).clone())
    }
}

impl Entity for SnapshotCamera {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Camera
    }

    fn location_id(&self) -> &str {
        &self.location_id
    }

    fn state(&self, snapshot: &Snapshot, _ctx: &ProjectionContext) -> EntityState {
        let mut state =
            EntityState::new(StateValue::Idle).with("location_id", self.location_id.clone());
        if let Some(ring) = self.latest_snapshot(snapshot) {
            state = state
                .with("last_snapshot_time", ring.date.clone())
                .with("call_from", ring.call_from.clone())
                .with("call_to", ring.call_to.clone());
        }
        state
    }
}
