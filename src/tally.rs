//! Vote tallying: quorum and majority thresholds.
//!
//! Pure functions over vote counts and an explicit [`VotingPolicy`].
//! Nothing here reads global configuration, so any policy can be tested
//! without touching process state.

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

/// Thresholds and timing that govern every bill.
#[derive(Debug, Clone, PartialEq)]
pub struct VotingPolicy {
    /// Fewest total votes for a bill to be decided rather than failed.
    pub minimum_quorum: u32,

    /// Share of yes votes an ordinary bill must exceed.
    pub normal_majority: f64,

    /// Share of yes votes a constitutional bill must exceed.
    pub supermajority: f64,

    /// How long a bill stays open for voting.
    pub voting_period: SignedDuration,
}

impl Default for VotingPolicy {
    fn default() -> Self {
        Self {
            minimum_quorum: 5,
            normal_majority: 1.0 / 2.0,
            supermajority: 2.0 / 3.0,
            voting_period: SignedDuration::from_hours(7 * 24),
        }
    }
}

impl VotingPolicy {
    /// The share of yes votes a bill must exceed to pass.
    pub fn threshold(&self, constitutional: bool) -> f64 {
        if constitutional {
            self.supermajority
        } else {
            self.normal_majority
        }
    }

    /// Rejects majorities outside `[0, 1]` and non-positive voting periods.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("normal-majority", self.normal_majority),
            ("supermajority", self.supermajority),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be between 0 and 1, got {value}"));
            }
        }
        if !self.voting_period.is_positive() {
            return Err(format!(
                "voting period must be positive, got {:?}",
                self.voting_period
            ));
        }
        Ok(())
    }
}

/// The decided result of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Too few votes to decide.
    Failed,
    Rejected,
    Approved,
}

/// Decide a bill from its vote counts.
///
/// Approval must strictly exceed the threshold: a bill sitting exactly on
/// it is rejected.
pub fn decide(
    total_votes: u32,
    yes_votes: u32,
    constitutional: bool,
    policy: &VotingPolicy,
) -> Outcome {
    if total_votes < policy.minimum_quorum {
        return Outcome::Failed;
    }
    // Only reachable with a zero quorum.
    if total_votes == 0 {
        return Outcome::Rejected;
    }

    let approval = f64::from(yes_votes) / f64::from(total_votes);
    if approval > policy.threshold(constitutional) {
        Outcome::Approved
    } else {
        Outcome::Rejected
    }
}

/// Approval as a percentage, for logging.
pub fn approval_percent(total_votes: u32, yes_votes: u32) -> f64 {
    if total_votes == 0 {
        return 0.0;
    }
    100.0 * f64::from(yes_votes) / f64::from(total_votes)
}
