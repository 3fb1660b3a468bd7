//! Small time/id helpers shared by the build event log and model store.

use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

/// ISO-8601-ish timestamp: seconds since epoch + 'Z'.
pub fn now_epoch_z() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}Z", secs)
}

/// A new unique, lexicographically sortable event id.
pub fn new_event_id() -> String {
    Ulid::new().to_string()
}
