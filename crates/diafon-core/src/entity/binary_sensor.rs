use std::time::Duration;

use diafon_api::{CallRecord, Location};

use super::{Entity, EntityKind, EntityState, ProjectionContext, StateValue, unique_id};
use crate::store::{Snapshot, duration_ms};

/// How long a doorbell sensor stays `on` after a ring.
pub const RING_WINDOW: Duration = Duration::from_millis(10_200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorbellKind {
    /// Rings at the building entrance. Calls dialled to a `0`-prefixed
    /// destination are intercom-internal and excluded.
    Entrance,
    /// Rings addressed to the resident's room.
    Apartment { room_id: String },
}

/// Doorbell "recently rang" sensor.
pub struct DoorbellSensor {
    unique_id: String,
    name: String,
    location_id: String,
    kind: DoorbellKind,
}

impl DoorbellSensor {
    pub fn new(location: &Location, kind: DoorbellKind) -> Self {
        let (suffix, label) = match kind {
            DoorbellKind::Entrance => ("doorbell_entrance", "Entrance Doorbell"),
            DoorbellKind::Apartment { .. } => ("doorbell_apartment", "Apartment Doorbell"),
        };
        Self {
            unique_id: unique_id(&location.location_id, suffix),
            name: format!("{} {label}", location.location_name),
            location_id: location.location_id.clone(),
            kind,
        }
    }

    pub fn doorbell_kind(&self) -> &DoorbellKind {
        &self.kind
    }

    /// Whether a missed call counts as a ring for this sensor.
    fn rings(&self, call: &CallRecord) -> bool {
        match &self.kind {
            DoorbellKind::Entrance => {
                call.location_id == self.location_id && !call.call_to.starts_with('0')
            }
            DoorbellKind::Apartment { room_id } => call.call_to == *room_id,
        }
    }

    /// The ring reported in the attributes.
    fn last_ring<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a CallRecord> {
        match &self.kind {
            DoorbellKind::Entrance => {
                snapshot.latest_missed(|c| c.location_id == self.location_id)
            }
            DoorbellKind::Apartment { room_id } => {
                snapshot.latest_missed(|c| c.call_to == *room_id)
            }
        }
    }

    /// True when a matching ring happened inside the trailing window.
    pub fn is_on(&self, snapshot: &Snapshot, ctx: &ProjectionContext) -> bool {
        let cutoff = ctx.now_ms.saturating_sub(duration_ms(RING_WINDOW));
        snapshot
            .call_records
            .iter()
            .any(|c| c.is_missed() && self.rings(c) && c.timestamp_ms() >= cutoff)
    }
}

impl Entity for DoorbellSensor {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::BinarySensor
    }

    fn location_id(&self) -> &str {
        &self.location_id
    }

    fn state(&self, snapshot: &Snapshot, ctx: &ProjectionContext) -> EntityState {
        let value = if self.is_on(snapshot, ctx) {
            StateValue::On
        } else {
            StateValue::Off
        };
        let mut state = EntityState::new(value).with("location_id", self.location_id.clone());

        if let Some(ring) = self.last_ring(snapshot) {
            state = state.with("last_ring_time", ring.date.clone());
            if let Some(path) = ring.snapshot_path() {
                state = state.with("snapshot_url", path);
            }
        }
        state
    }
}
