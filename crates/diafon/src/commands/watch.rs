//! Long-running watch: domain events and entity changes as they happen.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use diafon_core::{Coordinator, CoordinatorConfig, DomainEvent, PushState, Snapshot};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output::Output;

use super::entities::{EntityView, evaluate_all};

/// Doorbell sensors fall back to `off` by the clock alone, so entities
/// are re-evaluated on this period even without a new snapshot.
const REEVALUATE_EVERY: Duration = Duration::from_secs(1);

struct Printer {
    out: Output,
}

impl Printer {
    fn event(&self, event: &DomainEvent) {
        self.out.record("event", event, || {
            let line = match event {
                DomainEvent::DoorbellPressed(ring) => format!(
                    "doorbell  {} rang {} at {}{}",
                    ring.call_from,
                    ring.call_to,
                    ring.location_id,
                    ring.snapshot_path
                        .as_deref()
                        .map(|p| format!(" (snapshot {p})"))
                        .unwrap_or_default()
                ),
                DomainEvent::DoorOpened(opened) => format!(
                    "door      opened at {} via {}",
                    opened.location_name, opened.method
                ),
            };
            if !self.out.color() {
                return line;
            }
            match event {
                DomainEvent::DoorbellPressed(_) => line.yellow().bold().to_string(),
                DomainEvent::DoorOpened(_) => line.green().bold().to_string(),
            }
        });
    }

    fn entity(&self, view: &EntityView) {
        self.out.record("entity", view, || {
            let state = view.state.value.to_string();
            let state = if self.out.color() {
                state.cyan().to_string()
            } else {
                state
            };
            format!("entity    {} = {state}", view.unique_id)
        });
    }

    fn refresh(&self, status: &RefreshStatus) {
        self.out.record("refresh", status, || {
            let line = refresh_line(status);
            if self.out.color() && !status.ok {
                line.red().to_string()
            } else {
                line
            }
        });
    }

    fn push(&self, state: PushState) {
        let status = json!({ "push": state.to_string() });
        self.out.record("push", &status, || format!("push      {state}"));
    }
}

/// Outcome of one refresh that differs from the previous one.
#[derive(Debug, Serialize)]
struct RefreshStatus {
    ok: bool,
    last_refresh: Option<DateTime<Utc>>,
}

fn refresh_line(status: &RefreshStatus) -> String {
    if status.ok {
        return "refresh   recovered".into();
    }
    match status.last_refresh {
        Some(at) => format!(
            "refresh   failed, showing data from {}",
            at.with_timezone(&Local).format("%H:%M:%S")
        ),
        None => "refresh   failed".into(),
    }
}

/// Next push state, or `None` when push is off or the listener is gone.
async fn next_push_state(states: &mut Option<watch::Receiver<PushState>>) -> Option<PushState> {
    let states = states.as_mut()?;
    states.changed().await.ok()?;
    Some(*states.borrow_and_update())
}

/// Print entities whose evaluated state differs from the last one seen.
fn print_changes(
    snapshot: &Snapshot,
    last: &mut HashMap<String, EntityView>,
    printer: &Printer,
) {
    for view in evaluate_all(snapshot, None) {
        if last.get(&view.unique_id) != Some(&view) {
            printer.entity(&view);
            last.insert(view.unique_id.clone(), view);
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    mut config: CoordinatorConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.no_push {
        config.push_enabled = false;
    }
    if let Some(interval) = args.interval {
        config.scan_interval_secs = interval;
    }

    let coordinator = Coordinator::new(config)?;
    // Subscribed before connect so rings found by the first refresh print.
    let mut events = coordinator.events();
    coordinator.connect().await?;

    let printer = Printer {
        out: Output::new(global),
    };

    if !global.quiet {
        let push = match coordinator.push_state().await {
            Some(state) => state.to_string(),
            None => "off".into(),
        };
        eprintln!(
            "Watching {} (push: {push}, refresh every {}s). Ctrl-C to stop.",
            coordinator.config().email,
            coordinator.config().scan_interval_secs
        );
    }

    let mut snapshots = coordinator.snapshots();
    let mut refresh_results = coordinator.refresh_results();
    let mut refresh_ok = *refresh_results.borrow_and_update();
    let mut push_states = coordinator.push_state_changes().await;

    let mut last: HashMap<String, EntityView> = HashMap::new();
    let mut latest: Option<Arc<Snapshot>> = coordinator.snapshot();
    if !args.events_only {
        if let Some(ref snap) = latest {
            print_changes(snap, &mut last, &printer);
        }
    }

    let mut tick = tokio::time::interval(REEVALUATE_EVERY);

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => printer.event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = snapshots.changed() => {
                let Some(slot) = changed else { break };
                latest = slot;
                if !args.events_only {
                    if let Some(ref snap) = latest {
                        print_changes(snap, &mut last, &printer);
                    }
                }
            }
            Ok(()) = refresh_results.changed() => {
                let ok = *refresh_results.borrow_and_update();
                if ok != refresh_ok {
                    refresh_ok = ok;
                    printer.refresh(&RefreshStatus {
                        ok,
                        last_refresh: coordinator.last_refresh(),
                    });
                }
            }
            Some(state) = next_push_state(&mut push_states) => printer.push(state),
            _ = tick.tick() => {
                if !args.events_only {
                    if let Some(ref snap) = latest {
                        print_changes(snap, &mut last, &printer);
                    }
                }
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn failed_refresh_names_the_data_age() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 21, 4, 9).unwrap();
        let line = refresh_line(&RefreshStatus {
            ok: false,
            last_refresh: Some(at.with_timezone(&Utc)),
        });
        assert_eq!(line, "refresh   failed, showing data from 21:04:09");

        let line = refresh_line(&RefreshStatus {
            ok: true,
            last_refresh: None,
        });
        assert_eq!(line, "refresh   recovered");
    }

    #[tokio::test]
    async fn push_states_follow_the_listener() {
        let (tx, rx) = watch::channel(PushState::Subscribed);
        let mut states = Some(rx);

        tx.send_replace(PushState::Listening);
        assert_eq!(next_push_state(&mut states).await, Some(PushState::Listening));

        drop(tx);
        assert_eq!(next_push_state(&mut states).await, None);
        assert_eq!(next_push_state(&mut None).await, None);
    }
}
