// ── Door-open strategy types ──
//
// The strategy itself runs in the coordinator: probe for a ringing call
// and answer it with `controlCurrentCall`, otherwise (or if that fails)
// place a synthetic call with `addCall` + `setCallDuration`.

use serde::Serialize;
use strum::{AsRefStr, Display};

use diafon_api::Device;

/// Which vendor path opened the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
pub enum UnlockMethod {
    #[serde(rename = "controlCurrentCall")]
    #[strum(serialize = "controlCurrentCall")]
    ControlCurrentCall,
    #[serde(rename = "addCall")]
    #[strum(serialize = "addCall")]
    AddCall,
}

/// Result of one door-open attempt. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnlockOutcome {
    Opened {
        method: UnlockMethod,
        call_id: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl UnlockOutcome {
    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened { .. })
    }
}

/// The door unit an open-door action addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorTarget {
    pub location_id: String,
    pub location_name: String,
    pub device: Device,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_match_vendor_endpoints() {
        assert_eq!(UnlockMethod::ControlCurrentCall.to_string(), "controlCurrentCall");
        assert_eq!(UnlockMethod::AddCall.as_ref(), "addCall");
    }

    #[test]
    fn outcome_flags() {
        let opened = UnlockOutcome::Opened {
            method: UnlockMethod::AddCall,
            call_id: None,
        };
        assert!(opened.is_opened());
        assert!(!UnlockOutcome::Failed { reason: "x".into() }.is_opened());
    }
}
