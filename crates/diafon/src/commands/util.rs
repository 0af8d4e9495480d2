//! Shared helpers for command handlers.

use std::sync::Arc;

use diafon_core::{Coordinator, CoreError, Location, Snapshot};

use crate::error::CliError;

/// The coordinator's current snapshot. Always present after `connect`.
pub fn snapshot(coordinator: &Coordinator) -> Result<Arc<Snapshot>, CliError> {
    coordinator
        .snapshot()
        .ok_or_else(|| CoreError::NoData.into())
}

/// Resolve a location id against the snapshot.
pub fn find_location<'a>(snap: &'a Snapshot, location_id: &str) -> Result<&'a Location, CliError> {
    snap.location(location_id).ok_or_else(|| CliError::NotFound {
        resource_type: "location".into(),
        identifier: location_id.into(),
        list_command: "locations".into(),
    })
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
