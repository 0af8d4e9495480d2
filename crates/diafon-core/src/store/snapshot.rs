// ── Cached vendor snapshot ──
//
// One successful refresh's worth of data. Replaced wholesale, never
// merged. All queries are pure functions of the snapshot and an explicit
// clock so they can be evaluated deterministically.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use diafon_api::{Account, CallRecord, Device, Location};

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub locations: Vec<Location>,
    pub call_records: Vec<CallRecord>,
    pub account: Account,
    pub refreshed_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(locations: Vec<Location>, call_records: Vec<CallRecord>, account: Account) -> Self {
        Self {
            locations,
            call_records,
            account,
            refreshed_at: Utc::now(),
        }
    }

    pub fn location(&self, location_id: &str) -> Option<&Location> {
        self.locations
            .iter()
            .find(|l| l.location_id == location_id)
    }

    /// First door unit of the location.
    pub fn device_by_location(&self, location_id: &str) -> Option<&Device> {
        self.location(location_id).and_then(Location::device)
    }

    /// Records with `date >= now_ms - window`, optionally restricted to an
    /// exact `call_to`.
    pub fn recent_calls(
        &self,
        call_to: Option<&str>,
        window: Duration,
        now_ms: i64,
    ) -> Vec<&CallRecord> {
        let cutoff = now_ms.saturating_sub(duration_ms(window));
        self.call_records
            .iter()
            .filter(|c| c.timestamp_ms() >= cutoff)
            .filter(|c| call_to.is_none_or(|to| c.call_to == to))
            .collect()
    }

    /// Number of records, in any state, at or after `cutoff_ms`.
    pub fn count_since(&self, cutoff_ms: i64) -> usize {
        self.call_records
            .iter()
            .filter(|c| c.timestamp_ms() >= cutoff_ms)
            .count()
    }

    pub fn calls_for_location<'a>(
        &'a self,
        location_id: &'a str,
    ) -> impl Iterator<Item = &'a CallRecord> + 'a {
        self.call_records
            .iter()
            .filter(move |c| c.location_id == location_id)
    }

    /// Most recent `Missed` record matching `filter`. Ties resolve to the
    /// record listed first.
    pub fn latest_missed(&self, filter: impl Fn(&CallRecord) -> bool) -> Option<&CallRecord> {
        self.call_records
            .iter()
            .rev()
            .filter(|c| c.is_missed() && filter(c))
            .max_by_key(|c| c.timestamp_ms())
    }
}

/// Milliseconds in `window`, saturating.
pub(crate) fn duration_ms(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}
