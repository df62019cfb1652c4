//! Wall-clock helpers.

use chrono::{DateTime, Utc};
use ladder_types::Timestamp;

/// Current Unix time in seconds.
pub fn unix_now() -> Timestamp {
    to_unix(Utc::now())
}

/// Unix seconds of `at`, clamped at the epoch.
pub fn to_unix(at: DateTime<Utc>) -> Timestamp {
    u64::try_from(at.timestamp()).unwrap_or_default()
}
