use super::{Entity, EntityKind, EntityState, ProjectionContext, StateValue, unique_id};
use crate::coordinator::Coordinator;
use crate::store::Snapshot;
use crate::unlock::{DoorTarget, UnlockOutcome};

/// Stateless "open door" button.
pub struct DoorButton {
    unique_id: String,
    name: String,
    target: DoorTarget,
}

impl DoorButton {
    pub fn new(target: DoorTarget) -> Self {
        Self {
            unique_id: unique_id(&target.location_id, "door_button"),
            name: format!("{} Open Door", target.location_name),
            target,
        }
    }

    pub async fn press(&self, coordinator: &Coordinator) -> UnlockOutcome {
        coordinator.open_door(&self.target).await
    }
}

impl Entity for DoorButton {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Button
    }

    fn location_id(&self) -> &str {
        &self.target.location_id
    }

    fn state(&self, _snapshot: &Snapshot, _ctx: &ProjectionContext) -> EntityState {
        EntityState::new(StateValue::Unknown).with("location_id", self.target.location_id.clone())
    }
}
