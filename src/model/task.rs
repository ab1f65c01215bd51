//! Deferred submit tasks.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The deferred trigger that submits a bill when its voting period ends.
///
/// Disabled rather than deleted when a bill closes early, so a fire that
/// is already in flight finds a bill that is no longer open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTask {
    pub id: Uuid,
    pub bill: i64,
    pub run_at: Timestamp,
    pub last_run_at: Option<Timestamp>,
    pub enabled: bool,
}

impl SubmitTask {
    /// Whether the task should fire at `now`.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.enabled && self.run_at <= now
    }
}
