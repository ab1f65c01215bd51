//! Bills: democratic proposals to merge a pull request.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a bill stands in its lifecycle.
///
/// `Draft` and `Open` are the only non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// The pull request is a draft; no voting yet.
    Draft,
    Open,
    Approved,
    Rejected,

    /// Did not reach quorum.
    Failed,

    /// The pull request was closed on GitHub before the vote ended.
    Closed,
}

impl BillStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "open" => Some(Self::Open),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "failed" => Some(Self::Failed),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Open => "Open",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Failed => "Not Enough Votes",
            Self::Closed => "PR Closed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Draft | Self::Open)
    }
}

/// A proposal to merge a particular pull request into the main branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: i64,
    pub name: String,
    pub description: String,

    /// The proposing user.
    pub author: i64,

    /// Number of the pull request this bill would merge.
    pub pull_request: i64,

    pub status: BillStatus,

    /// True if the diff touches protected lines, requiring a supermajority.
    pub constitutional: bool,

    /// The task that submits this bill when voting ends.
    /// `None` only between inserting the bill and scheduling its task.
    pub submit_task: Option<Uuid>,

    pub created: Timestamp,
    pub modified: Timestamp,
}

/// A bill with its vote counts and, optionally, one viewer's vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSummary {
    pub bill: Bill,
    pub total_votes: u32,
    pub yes_count: u32,
    pub no_count: u32,

    /// The viewer's vote: `Some(true)` for, `Some(false)` against, `None` if
    /// they have not voted or no viewer was given.
    pub user_vote: Option<bool>,
}

impl BillSummary {
    /// Share of yes votes as a percentage, 0 when nobody has voted.
    pub fn yes_percent(&self) -> f64 {
        percent(self.yes_count, self.total_votes)
    }

    /// Share of no votes as a percentage, 0 when nobody has voted.
    pub fn no_percent(&self) -> f64 {
        percent(self.no_count, self.total_votes)
    }
}

fn percent(count: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * f64::from(count) / f64::from(total)
}
