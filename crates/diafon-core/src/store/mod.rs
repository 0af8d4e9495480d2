// ── Snapshot storage ──

mod data_store;
mod snapshot;

pub use data_store::DataStore;
pub use snapshot::Snapshot;
pub(crate) use snapshot::duration_ms;
