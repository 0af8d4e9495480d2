//! Entity command handler.

use diafon_core::{
    Coordinator, Entity, EntityKind, EntityState, ProjectionContext, Snapshot, build_entities,
};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{EntitiesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{Listed, Output};

use super::util;

/// One evaluated entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub unique_id: String,
    pub name: String,
    pub kind: EntityKind,
    pub location_id: String,
    #[serde(flatten)]
    pub state: EntityState,
}

impl EntityView {
    pub fn evaluate(entity: &dyn Entity, snapshot: &Snapshot, ctx: &ProjectionContext) -> Self {
        Self {
            unique_id: entity.unique_id().to_owned(),
            name: entity.name().to_owned(),
            kind: entity.kind(),
            location_id: entity.location_id().to_owned(),
            state: entity.state(snapshot, ctx),
        }
    }
}

/// Evaluate every entity of the snapshot, optionally for one location.
pub fn evaluate_all(snapshot: &Snapshot, location: Option<&str>) -> Vec<EntityView> {
    let ctx = ProjectionContext::now();
    let set = build_entities(snapshot);
    set.iter()
        .filter(|e| location.is_none_or(|id| e.location_id() == id))
        .map(|e| EntityView::evaluate(e, snapshot, &ctx))
        .collect()
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct EntityRow {
    #[tabled(rename = "Entity")]
    unique_id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Attributes")]
    attributes: String,
}

impl Listed for EntityView {
    type Row = EntityRow;

    fn row(&self) -> EntityRow {
        EntityRow {
            unique_id: self.unique_id.clone(),
            kind: self.kind.to_string(),
            name: self.name.clone(),
            state: self.state.value.to_string(),
            attributes: self
                .state
                .attributes
                .iter()
                .filter(|(key, _)| key.as_str() != "location_id")
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => format!("{key}={s}"),
                    other => format!("{key}={other}"),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn plain(&self) -> String {
        format!("{}\t{}", self.unique_id, self.state.value)
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    coordinator: &Coordinator,
    args: &EntitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snap = util::snapshot(coordinator)?;
    if let Some(ref id) = args.location {
        util::find_location(&snap, id)?;
    }

    let views = evaluate_all(&snap, args.location.as_deref());
    Output::new(global).list(&views);
    Ok(())
}
