// ── Entity projections ──
//
// Home-automation style views over a snapshot. Each entity is a pure
// projection: `state()` is recomputed from the snapshot and the
// evaluation clock on every call, nothing is cached between refreshes
// except the camera's last good image.

mod binary_sensor;
mod button;
mod camera;
mod lock;
mod sensor;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveTime, Offset, TimeZone};
use serde::{Serialize, Serializer};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::store::Snapshot;
use crate::unlock::DoorTarget;

pub use binary_sensor::{DoorbellKind, DoorbellSensor, RING_WINDOW};
pub use button::DoorButton;
pub use camera::SnapshotCamera;
pub use lock::DoorLock;
pub use sensor::{CallSensor, SensorKind};

/// Prefix shared by every entity's unique id.
pub const UNIQUE_ID_PREFIX: &str = "multitek_diafonbox";

pub(crate) fn unique_id(location_id: &str, suffix: &str) -> String {
    format!("{UNIQUE_ID_PREFIX}_{location_id}_{suffix}")
}

// ── Kind & state ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Lock,
    Button,
    BinarySensor,
    Camera,
    Sensor,
}

/// Primary state of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Locked,
    On,
    Off,
    Idle,
    Text(String),
    Count(usize),
    Unknown,
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => f.write_str("locked"),
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Idle => f.write_str("idle"),
            Self::Text(s) => f.write_str(s),
            Self::Count(n) => write!(f, "{n}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => n.serialize(serializer),
            Self::Unknown => serializer.serialize_none(),
            other => serializer.collect_str(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub value: StateValue,
    pub attributes: BTreeMap<String, Value>,
}

impl EntityState {
    pub fn new(value: StateValue) -> Self {
        Self {
            value,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }
}

// ── Evaluation clock ─────────────────────────────────────────────

/// Evaluation time for a projection: now, local midnight, and the local
/// UTC offset used for rendering timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionContext {
    pub now_ms: i64,
    pub midnight_ms: i64,
    pub offset: FixedOffset,
}

impl ProjectionContext {
    /// Context for the current wall-clock time in the host's zone.
    pub fn now() -> Self {
        Self::at(&Local::now())
    }

    /// Context for an arbitrary instant; midnight is taken in `now`'s zone.
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let offset = now.offset().fix();
        let now_ms = now.timestamp_millis();
        let midnight_ms = now
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_local_timezone(offset)
            .earliest()
            .map_or(now_ms, |m| m.timestamp_millis());

        Self {
            now_ms,
            midnight_ms,
            offset,
        }
    }
}

// ── Entity trait ─────────────────────────────────────────────────

pub trait Entity: Send + Sync {
    fn unique_id(&self) -> &str;
    fn name(&self) -> &str;
    fn kind(&self) -> EntityKind;
    fn location_id(&self) -> &str;
    fn state(&self, snapshot: &Snapshot, ctx: &ProjectionContext) -> EntityState;
}

/// Every entity derived from one snapshot, grouped by kind.
#[derive(Default)]
pub struct EntitySet {
    pub locks: Vec<DoorLock>,
    pub buttons: Vec<DoorButton>,
    pub doorbells: Vec<DoorbellSensor>,
    pub cameras: Vec<SnapshotCamera>,
    pub sensors: Vec<CallSensor>,
}

impl EntitySet {
    pub fn iter(&self) -> impl Iterator<Item = &dyn Entity> {
        let locks = self.locks.iter().map(|e| e as &dyn Entity);
        let buttons = self.buttons.iter().map(|e| e as &dyn Entity);
        let doorbells = self.doorbells.iter().map(|e| e as &dyn Entity);
        let cameras = self.cameras.iter().map(|e| e as &dyn Entity);
        let sensors = self.sensors.iter().map(|e| e as &dyn Entity);
        locks
            .chain(buttons)
            .chain(doorbells)
            .chain(cameras)
            .chain(sensors)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, unique_id: &str) -> Option<&dyn Entity> {
        self.iter().find(|e| e.unique_id() == unique_id)
    }
}

/// Instantiate the entities for every location in `snapshot`.
///
/// Locations with a door unit get a lock and a button, locations with a
/// room get the two doorbell sensors, and every location gets a camera
/// and the three call sensors.
pub fn build_entities(snapshot: &Snapshot) -> EntitySet {
    let mut set = EntitySet::default();

    for location in &snapshot.locations {
        if let Some(device) = location.device() {
            let target = DoorTarget {
                location_id: location.location_id.clone(),
                location_name: location.location_name.clone(),
                device: device.clone(),
            };
            set.locks.push(DoorLock::new(target.clone()));
            set.buttons.push(DoorButton::new(target));
        }

        if let Some(room) = location.room() {
            set.doorbells.push(DoorbellSensor::new(
                location,
                DoorbellKind::Entrance,
            ));
            set.doorbells.push(DoorbellSensor::new(
                location,
                DoorbellKind::Apartment {
                    room_id: room.room_id(),
                },
            ));
        }

        set.cameras.push(SnapshotCamera::new(location));
        for kind in [SensorKind::LastRing, SensorKind::TodayCount, SensorKind::TotalCalls] {
            set.sensors.push(CallSensor::new(location, kind));
        }
    }

    set
}
