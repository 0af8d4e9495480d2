use chrono::{DateTime, SecondsFormat};
use diafon_api::Location;

use super::{Entity, EntityKind, EntityState, ProjectionContext, StateValue, unique_id};
use crate::store::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Local time of the latest missed call.
    LastRing,
    /// Missed calls since local midnight.
    TodayCount,
    /// All calls of the location.
    TotalCalls,
}

impl SensorKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::LastRing => "last_ring",
            Self::TodayCount => "today_count",
            Self::TotalCalls => "total_calls",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::LastRing => "Last Ring",
            Self::TodayCount => "Today's Rings",
            Self::TotalCalls => "Total Calls",
        }
    }
}

/// Call statistics for one location, recomputed on every evaluation.
pub struct CallSensor {
    unique_id: String,
    name: String,
    location_id: String,
    kind: SensorKind,
}

impl CallSensor {
    pub fn new(location: &Location, kind: SensorKind) -> Self {
        Self {
            unique_id: unique_id(&location.location_id, kind.suffix()),
            name: format!("{} {}", location.location_name, kind.label()),
            location_id: location.location_id.clone(),
            kind,
        }
    }

    pub fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    fn last_ring(&self, snapshot: &Snapshot, ctx: &ProjectionContext) -> StateValue {
        snapshot
            .latest_missed(|c| c.location_id == self.location_id)
            .and_then(|c| DateTime::from_timestamp_millis(c.timestamp_ms()))
            .map_or(StateValue::Unknown, |at| {
                StateValue::Text(
                    at.with_timezone(&ctx.offset)
                        .to_rfc3339_opts(SecondsFormat::Secs, false),
                )
            })
    }

    fn today_count(&self, snapshot: &Snapshot, ctx: &ProjectionContext) -> usize {
        snapshot
            .calls_for_location(&self.location_id)
            .filter(|c| c.is_missed() && c.timestamp_ms() >= ctx.midnight_ms)
            .count()
    }
}

impl Entity for CallSensor {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Sensor
    }

    fn location_id(&self) -> &str {
        &self.location_id
    }

    fn state(&self, snapshot: &Snapshot, ctx: &ProjectionContext) -> EntityState {
        match self.kind {
            SensorKind::LastRing => EntityState::new(self.last_ring(snapshot, ctx)),
            SensorKind::TodayCount => {
                let count = self.today_count(snapshot, ctx);
                EntityState::new(StateValue::Count(count)).with("today_count", count)
            }
            SensorKind::TotalCalls => EntityState::new(StateValue::Count(
                snapshot.calls_for_location(&self.location_id).count(),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::FixedOffset;
    use serde_json::json;

    use super::*;
    use crate::entity::tests::{call, location, snapshot};

    fn sensor(kind: SensorKind) -> CallSensor {
        CallSensor::new(&location("L1", true, true), kind)
    }

    fn ctx_with(now_ms: i64, midnight_ms: i64, offset_secs: i32) -> ProjectionContext {
        ProjectionContext {
            now_ms,
            midnight_ms,
            offset: FixedOffset::east_opt(offset_secs).unwrap(),
        }
    }

    #[test]
    fn last_ring_renders_local_time() {
        // 2024-01-01T00:00:00Z
        let at = 1_704_067_200_000;
        let snap = snapshot(vec![], vec![call("a", "Missed", at, "L1", "101", None)]);
        let state = sensor(SensorKind::LastRing).state(&snap, &ctx_with(at, 0, 3 * 3600));
        assert_eq!(
            state.value,
            StateValue::Text("2024-01-01T03:00:00+03:00".into())
        );
    }

    #[test]
    fn last_ring_unknown_without_missed_calls() {
        let snap = snapshot(vec![], vec![call("a", "Outgoing", 5, "L1", "101", None)]);
        let state = sensor(SensorKind::LastRing).state(&snap, &ctx_with(10, 0, 0));
        assert_eq!(state.value, StateValue::Unknown);
    }

    #[test]
    fn today_count_only_missed_since_midnight() {
        let snap = snapshot(
            vec![],
            vec![
                call("a", "Missed", 500, "L1", "101", None),
                call("b", "Missed", 1_500, "L1", "101", None),
                call("c", "Outgoing", 1_600, "L1", "101", None),
                call("d", "Missed", 1_700, "L2", "101", None),
                call("e", "Missed", 1_000, "L1", "101", None),
            ],
        );
        let state = sensor(SensorKind::TodayCount).state(&snap, &ctx_with(2_000, 1_000, 0));
        assert_eq!(state.value, StateValue::Count(2));
        assert_eq!(state.attributes["today_count"], json!(2));
    }

    #[test]
    fn total_calls_counts_every_state() {
        let snap = snapshot(
            vec![],
            vec![
                call("a", "Missed", 1, "L1", "101", None),
                call("b", "Outgoing", 2, "L1", "101", None),
                call("c", "Missed", 3, "L2", "101", None),
            ],
        );
        let state = sensor(SensorKind::TotalCalls).state(&snap, &ctx_with(10, 0, 0));
        assert_eq!(state.value, StateValue::Count(2));
        assert!(state.attributes.is_empty());
    }
}
