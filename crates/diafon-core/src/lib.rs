// diafon-core: Refresh coordinator and entity layer between diafon-api and hosts (CLI).

pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod events;
pub mod store;
pub mod stream;
pub mod topics;
pub mod unlock;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoordinatorConfig, TlsVerification};
pub use coordinator::{ConnectionState, Coordinator};
pub use entity::{
    Entity, EntityKind, EntitySet, EntityState, ProjectionContext, StateValue, build_entities,
};
pub use error::CoreError;
pub use events::{DomainEvent, DoorOpened, DoorbellPressed};
pub use store::{DataStore, Snapshot};
pub use stream::SnapshotStream;
pub use unlock::{DoorTarget, UnlockMethod, UnlockOutcome};

// Vendor model types surface through the snapshot.
pub use diafon_api::{Account, AppInfo, CallRecord, CallState, Device, Location, PushState, Room};
