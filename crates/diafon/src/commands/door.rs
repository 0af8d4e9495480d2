//! Open-door command handler.

use diafon_core::{Coordinator, UnlockOutcome};

use crate::cli::{GlobalOpts, OpenDoorArgs};
use crate::error::CliError;
use crate::output::Output;

pub async fn handle(
    coordinator: &Coordinator,
    args: OpenDoorArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let target = coordinator.resolve_target(args.location.as_deref())?;

    match coordinator.open_door(&target).await {
        outcome @ UnlockOutcome::Opened { method, .. } => {
            Output::new(global).item(
                &outcome,
                || format!("Door opened at {} (via {method})", target.location_name),
                || method.to_string(),
            );
            Ok(())
        }
        UnlockOutcome::Failed { reason } => Err(CliError::DoorFailed {
            location: target.location_name,
            reason,
        }),
    }
}
