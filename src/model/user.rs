//! Users who may propose and vote on bills.

use serde::{Deserialize, Serialize};

/// A registered user.
///
/// `github_id` is the numeric GitHub account id (as text), used to
/// resolve pull request authors to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub github_id: String,
}
