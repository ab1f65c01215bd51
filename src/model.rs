//! Core data model for Webiscite.
//!
//! These types mirror what the engine persists and reasons about:
//! pull requests, the bills proposed from them, votes, users, and the
//! deferred submit tasks that end each voting period.

mod bill;
mod event;
mod pull_request;
mod task;
mod user;
mod vote;

pub use bill::{Bill, BillStatus, BillSummary};
pub use event::{PullRequestAction, PullRequestEvent};
pub use pull_request::{PullRequest, PullRequestStatus};
pub use task::SubmitTask;
pub use user::User;
pub use vote::{Vote, VoteChange};
