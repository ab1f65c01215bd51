//! Pull request types: the local mirror of a GitHub pull request.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// State of a pull request on GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestStatus {
    Open,
    Closed,
}

impl PullRequestStatus {
    /// The stored and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Parses the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Local representation of a pull request on GitHub.
///
/// Keyed by `number`. Created or updated whenever a pull request event
/// arrives, whether or not its author can propose a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: i64,
    pub title: String,

    /// Lines added.
    pub additions: i64,

    /// Lines removed.
    pub deletions: i64,

    /// URL to the diff of the pull request.
    pub diff_url: String,

    /// GitHub login of the author, kept even when they have no account here.
    pub author_name: String,

    pub status: PullRequestStatus,

    /// Head commit of the pull request. Unique across pull requests.
    pub sha: String,

    pub draft: bool,
    pub created: Timestamp,
    pub modified: Timestamp,
}

impl PullRequest {
    /// Link to the pull request's changed-files page.
    ///
    /// Drops the `.diff` extension from `diff_url`.
    pub fn diff_link(&self) -> String {
        let base = self
            .diff_url
            .rsplit_once('.')
            .map_or(self.diff_url.as_str(), |(base, _)| base);
        format!("{base}/files")
    }
}
