//! Pull request events, typed once at the webhook boundary.

use serde::{Deserialize, Serialize};

/// The pull request webhook actions the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Opened,
    Reopened,
    ReadyForReview,
    Closed,
}

impl PullRequestAction {
    /// Parses the `action` field of a GitHub pull request payload.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opened" => Some(Self::Opened),
            "reopened" => Some(Self::Reopened),
            "ready_for_review" => Some(Self::ReadyForReview),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Reopened => "reopened",
            Self::ReadyForReview => "ready_for_review",
            Self::Closed => "closed",
        }
    }
}

/// The fields of a GitHub pull request the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestEvent {
    pub number: i64,
    pub title: String,
    pub additions: i64,
    pub deletions: i64,
    pub diff_url: String,
    pub author_login: String,

    /// GitHub account id of the author, as text.
    pub author_id: String,

    /// Head commit sha.
    pub sha: String,

    /// `open` or `closed`.
    pub state: String,
    pub draft: bool,

    /// Pull request body; empty when GitHub sends `null`.
    pub body: String,
}
