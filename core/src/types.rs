//! Shared primitive types used across the rotation engine.

use chrono::{DateTime, TimeZone, Utc};

/// A stable, unique identifier for a participant or award event.
pub type EntityId = String;

/// A fairness epoch. Starts at 0 and never decreases.
pub type CycleNumber = u64;

/// Award points. Tier values are always positive.
pub type Points = u64;

/// Wall-clock instant attached to awards and audit rows.
pub type Timestamp = DateTime<Utc>;

/// Timestamps are persisted as epoch milliseconds.
pub fn to_millis(ts: &Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Inverse of [`to_millis`]. Out-of-range values clamp to the epoch.
pub fn from_millis(ms: i64) -> Timestamp {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
