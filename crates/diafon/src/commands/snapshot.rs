//! Ring snapshot download.

use diafon_core::Coordinator;
use diafon_core::entity::SnapshotCamera;
use serde_json::json;

use crate::cli::{GlobalOpts, SnapshotArgs};
use crate::error::CliError;
use crate::output::{self, Output};

use super::util;

pub async fn handle(
    coordinator: &Coordinator,
    args: SnapshotArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snap = util::snapshot(coordinator)?;
    let location = match args.location {
        Some(ref id) => util::find_location(&snap, id)?,
        None => snap.locations.first().ok_or_else(|| CliError::NotFound {
            resource_type: "location".into(),
            identifier: "(any)".into(),
            list_command: "locations".into(),
        })?,
    };

    let camera = SnapshotCamera::new(location);
    let ring = camera.latest_snapshot(&snap).cloned().ok_or_else(|| CliError::NotFound {
        resource_type: "snapshot".into(),
        identifier: location.location_id.clone(),
        list_command: "calls list --missed".into(),
    })?;

    let image = camera.image(coordinator).await.ok_or_else(|| CliError::ApiError {
        message: format!(
            "could not download snapshot {}",
            ring.snapshot_path().unwrap_or_default()
        ),
    })?;

    tokio::fs::write(&args.out, &image).await?;

    let summary = json!({
        "path": args.out.display().to_string(),
        "bytes": image.len(),
        "call_id": ring.call_id,
        "time": output::format_local_ms(ring.timestamp_ms()),
    });
    Output::new(global).item(
        &summary,
        || {
            format!(
                "Saved {} bytes to {} (ring at {})",
                image.len(),
                args.out.display(),
                output::format_local_ms(ring.timestamp_ms())
            )
        },
        || args.out.display().to_string(),
    );
    Ok(())
}
