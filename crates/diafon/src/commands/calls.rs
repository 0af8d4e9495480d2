//! Call history command handlers.

use std::time::Duration;

use diafon_core::{CallRecord, Coordinator};
use serde_json::json;
use tabled::Tabled;

use crate::cli::{CallsArgs, CallsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Listed, Output};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct CallRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Snapshot")]
    snapshot: String,
}

impl Listed for CallRecord {
    type Row = CallRow;

    fn row(&self) -> CallRow {
        CallRow {
            id: self.call_id.clone(),
            time: output::format_local_ms(self.timestamp_ms()),
            state: self.call_state.to_string(),
            from: self.call_from.clone(),
            to: self.call_to.clone(),
            location: self.location_id.clone(),
            snapshot: if self.snapshot_path().is_some() { "yes" } else { "" }.into(),
        }
    }

    /// `call_id  date  state  call_from  call_to`
    fn plain(&self) -> String {
        let state = self.call_state.to_string();
        [
            self.call_id.as_str(),
            self.date.as_str(),
            state.as_str(),
            self.call_from.as_str(),
            self.call_to.as_str(),
        ]
        .join("\t")
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    coordinator: &Coordinator,
    args: CallsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        CallsCommand::List {
            location,
            missed,
            limit,
        } => {
            let snap = util::snapshot(coordinator)?;
            if let Some(ref id) = location {
                util::find_location(&snap, id)?;
            }

            let mut calls: Vec<CallRecord> = snap
                .call_records
                .iter()
                .filter(|c| location.as_deref().is_none_or(|id| c.location_id == id))
                .filter(|c| !missed || c.is_missed())
                .cloned()
                .collect();
            calls.sort_by_key(|c| std::cmp::Reverse(c.timestamp_ms()));
            calls.truncate(limit);

            Output::new(global).list(&calls);
            Ok(())
        }

        CallsCommand::Recent { minutes, to } => {
            let window = Duration::from_secs(minutes.saturating_mul(60));
            let calls = coordinator.get_recent_calls(to.as_deref(), window);
            Output::new(global).list(&calls);
            Ok(())
        }

        CallsCommand::Today => {
            let count = coordinator.get_today_call_count();
            Output::new(global).item(
                &json!({ "today_count": count }),
                || format!("{count} call(s) since midnight"),
                || count.to_string(),
            );
            Ok(())
        }
    }
}
