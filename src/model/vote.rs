//! Votes for or against a bill.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One user's vote on one bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub bill: i64,
    pub user: i64,
    pub support: bool,

    /// When the vote was cast or last changed.
    pub cast_at: Timestamp,
}

/// What a vote toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteChange {
    /// No previous vote; a new one was recorded.
    Cast,

    /// The user voted the same way again, so the vote was removed.
    Retracted,

    /// The user switched sides.
    Changed,
}
