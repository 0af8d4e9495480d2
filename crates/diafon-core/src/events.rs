// ── Domain events ──
//
// Published on the coordinator's broadcast channel. The event type
// strings are the names host automations subscribe to.

use serde::Serialize;

use diafon_api::CallRecord;

use crate::unlock::UnlockMethod;

pub const EVENT_DOORBELL_PRESSED: &str = "multitek_diafonbox_doorbell_pressed";
pub const EVENT_DOOR_OPENED: &str = "multitek_diafonbox_door_opened";

/// A new `Missed` call, seen for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorbellPressed {
    pub call_id: String,
    pub call_from: String,
    pub call_to: String,
    pub location_id: String,
    /// Vendor `date` (epoch milliseconds as a string).
    pub timestamp: String,
    pub snapshot_path: Option<String>,
}

impl From<&CallRecord> for DoorbellPressed {
    fn from(call: &CallRecord) -> Self {
        Self {
            call_id: call.call_id.clone(),
            call_from: call.call_from.clone(),
            call_to: call.call_to.clone(),
            location_id: call.location_id.clone(),
            timestamp: call.date.clone(),
            snapshot_path: call.path.clone(),
        }
    }
}

/// The door-open strategy succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorOpened {
    pub location_id: String,
    pub location_name: String,
    pub device_sip: String,
    pub method: UnlockMethod,
    pub call_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event_type", content = "data")]
pub enum DomainEvent {
    #[serde(rename = "multitek_diafonbox_doorbell_pressed")]
    DoorbellPressed(DoorbellPressed),
    #[serde(rename = "multitek_diafonbox_door_opened")]
    DoorOpened(DoorOpened),
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::DoorbellPressed(_) => EVENT_DOORBELL_PRESSED,
            Self::DoorOpened(_) => EVENT_DOOR_OPENED,
        }
    }

    pub fn location_id(&self) -> &str {
        match self {
            Self::DoorbellPressed(e) => &e.location_id,
            Self::DoorOpened(e) => &e.location_id,
        }
    }
}
