use super::{Entity, EntityKind, EntityState, ProjectionContext, StateValue, unique_id};
use crate::coordinator::Coordinator;
use crate::store::Snapshot;
use crate::unlock::{DoorTarget, UnlockOutcome};

/// The door of a location. The door relocks by itself, so the lock
/// always reports `locked` and locking is a no-op.
pub struct DoorLock {
    unique_id: String,
    name: String,
    target: DoorTarget,
}

impl DoorLock {
    pub fn new(target: DoorTarget) -> Self {
        Self {
            unique_id: unique_id(&target.location_id, "lock"),
            name: format!("{} Door", target.location_name),
            target,
        }
    }

    pub fn target(&self) -> &DoorTarget {
        &self.target
    }

    /// Open the door.
    pub async fn unlock(&self, coordinator: &Coordinator) -> UnlockOutcome {
        coordinator.open_door(&self.target).await
    }

    #[allow(clippy::unused_self)]
    pub fn lock(&self) {}
}

impl Entity for DoorLock {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Lock
    }

    fn location_id(&self) -> &str {
        &self.target.location_id
    }

    fn state(&self, _snapshot: &Snapshot, _ctx: &ProjectionContext) -> EntityState {
        EntityState::new(StateValue::Locked)
            .with("location_id", self.target.location_id.clone())
            .with("location_name", self.target.location_name.clone())
            .with("device_mac", self.target.device.mac.clone())
            .with("device_sip", self.target.device.sip.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::entity::build_entities;
    use crate::entity::tests::{ctx, location, snapshot};

    #[test]
    fn always_locked_with_device_attributes() {
        let snap = snapshot(vec![location("L1", true, false)], vec![]);
        let set = build_entities(&snap);
        let lock = &set.locks[0];

        assert_eq!(lock.name(), "Home L1 Door");
        let state = lock.state(&snap, &ctx(0));
        assert_eq!(state.value, StateValue::Locked);
        assert_eq!(state.attributes["location_id"], json!("L1"));
        assert_eq!(state.attributes["location_name"], json!("Home L1"));
        assert_eq!(state.attributes["device_mac"], json!("AA:BB"));
        assert_eq!(state.attributes["device_sip"], json!("D-SIP"));

        lock.lock();
        assert_eq!(lock.state(&snap, &ctx(0)).value, StateValue::Locked);
    }
}
