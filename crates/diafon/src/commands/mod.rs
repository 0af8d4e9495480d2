//! Command dispatch: bridges CLI args -> coordinator -> output formatting.

pub mod calls;
pub mod config_cmd;
pub mod door;
pub mod entities;
pub mod locations;
pub mod setup;
pub mod snapshot;
pub mod util;
pub mod watch;

use diafon_core::Coordinator;

use crate::cli::{CallsArgs, EntitiesArgs, GlobalOpts, OpenDoorArgs, SnapshotArgs};
use crate::config;
use crate::error::CliError;

/// A command answered by a single connect, query, shutdown cycle.
#[derive(Debug)]
pub enum Query {
    OpenDoor(OpenDoorArgs),
    Locations,
    Calls(CallsArgs),
    Entities(EntitiesArgs),
    Snapshot(SnapshotArgs),
}

/// Run a query against a freshly logged-in coordinator without push or
/// polling.
pub async fn dispatch(query: Query, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator_config = config::resolve_coordinator_config(global)?;
    tracing::debug!(?query, "dispatching query");

    Coordinator::oneshot(coordinator_config, |coordinator| async move {
        Ok(match query {
            Query::OpenDoor(args) => door::handle(&coordinator, args, global).await,
            Query::Locations => locations::handle(&coordinator, global),
            Query::Calls(args) => calls::handle(&coordinator, args, global),
            Query::Entities(args) => entities::handle(&coordinator, &args, global),
            Query::Snapshot(args) => snapshot::handle(&coordinator, args, global).await,
        })
    })
    .await?
}
