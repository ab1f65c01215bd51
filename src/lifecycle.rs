//! The bill state machine.
//!
//! ```text
//! draft ──publish──▶ open ──submit──▶ approved | rejected | failed
//!   │                  │
//!   └──────close───────┴──────────▶ closed
//! ```
//!
//! A pull request has at most one draft or open bill at a time. Every bill
//! owns a submit task that fires when its voting period ends; closing a bill
//! disables the task rather than deleting it, and a task that fires on a
//! bill that already left `open` is a no-op.

use jiff::Timestamp;
use tracing::{info, warn};

use crate::{
    constitution::{self, ConstitutionError, ProtectionRegistry},
    github::{HostError, PullRequestHost},
    model::{
        Bill, BillStatus, BillSummary, PullRequest, PullRequestEvent, PullRequestStatus, Vote,
        VoteChange,
    },
    schedule::Scheduler,
    storage::{NewBill, Storage, StorageError},
    tally::{self, Outcome, VotingPolicy},
};

/// Errors from driving a bill through its lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum BillError {
    #[error("{0}")]
    Validation(String),

    #[error("bill {0} is not open for voting")]
    ClosedBillVote(i64),

    #[error("{0}")]
    NotFound(String),

    #[error("host error: {0}")]
    External(#[from] HostError),

    #[error("constitution error: {0}")]
    Constitution(#[from] ConstitutionError),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for BillError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::BillNotFound(_)
            | StorageError::PullRequestNotFound(_)
            | StorageError::UserNotFound(_)
            | StorageError::TaskNotFound(_) => Self::NotFound(e.to_string()),
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = core::result::Result<T, BillError>;

/// Pull request and bill touched by a webhook action, when they exist.
pub type Touched = (Option<PullRequest>, Option<Bill>);

/// The bill after [`Lifecycle::submit`].
#[derive(Debug)]
pub struct Submission {
    pub bill: Bill,

    /// True if this call moved the bill out of `open`.
    pub decided: bool,
}

/// Drives bills through their lifecycle against one repository.
pub struct Lifecycle<'a, H> {
    storage: &'a Storage,
    host: &'a H,
    registry: &'a ProtectionRegistry,
    policy: &'a VotingPolicy,
}

impl<'a, H: PullRequestHost> Lifecycle<'a, H> {
    pub fn new(
        storage: &'a Storage,
        host: &'a H,
        registry: &'a ProtectionRegistry,
        policy: &'a VotingPolicy,
    ) -> Self {
        Self {
            storage,
            host,
            registry,
            policy,
        }
    }

    pub fn storage(&self) -> &'a Storage {
        self.storage
    }

    pub fn host(&self) -> &'a H {
        self.host
    }

    pub fn registry(&self) -> &'a ProtectionRegistry {
        self.registry
    }

    /// Mirrors an opened or reopened pull request and proposes it as a bill.
    ///
    /// No bill is created when the author has no account. The bill starts
    /// as a draft if the pull request is one. Its constitutionality is
    /// decided from the pull request's diff against the protection document
    /// as it stands now, after pulling the checkout.
    pub fn open_pull_request(
        &self,
        event: &PullRequestEvent,
        now: Timestamp,
    ) -> Result<(PullRequest, Option<Bill>)> {
        let pr = self.storage.upsert_pull_request(&mirror(event, now)?)?;
        info!(pr = pr.number, sha = %pr.sha, "pull request mirrored");

        let Some(author) = self.storage.find_user_by_github_id(&event.author_id)? else {
            warn!(
                pr = pr.number,
                author = %event.author_login,
                "no bill created: author has no account"
            );
            return Ok((pr, None));
        };

        self.ensure_no_live_bill(pr.number)?;

        // The document may have been amended since the checkout was last
        // pulled.
        self.host.refresh()?;
        let diff = self.host.fetch_diff(&pr)?;
        let protection = self.registry.read()?;
        let touched = constitution::is_constitutional(&diff, &protection)
            .map_err(ConstitutionError::from)?;
        let constitutional = !touched.is_empty();
        if constitutional {
            info!(pr = pr.number, files = ?touched, "diff touches protected lines");
        }

        let status = if pr.draft {
            BillStatus::Draft
        } else {
            BillStatus::Open
        };
        let run_at = self.deadline(now)?;

        let bill = self.storage.atomically(|| -> Result<_> {
            self.ensure_no_live_bill(pr.number)?;
            let mut bill = self.storage.insert_bill(
                &NewBill {
                    name: &pr.title,
                    description: &event.body,
                    author: author.id,
                    pull_request: pr.number,
                    status,
                    constitutional,
                },
                now,
            )?;
            let task = self
                .storage
                .schedule(bill.id, run_at, status == BillStatus::Open)?;
            self.storage.link_submit_task(bill.id, task.id)?;
            bill.submit_task = Some(task.id);
            Ok(bill)
        })?;

        info!(
            pr = pr.number,
            bill = bill.id,
            user = %author.username,
            status = bill.status.as_str(),
            constitutional,
            "bill created"
        );
        Ok((pr, Some(bill)))
    }

    /// Opens a draft bill for voting; the voting period starts now.
    pub fn publish(&self, bill_id: i64, now: Timestamp) -> Result<Bill> {
        let run_at = self.deadline(now)?;
        let bill = self.storage.atomically(|| -> Result<_> {
            let bill = self.storage.load_bill(bill_id)?;
            if bill.status != BillStatus::Draft {
                return Err(BillError::Validation(format!(
                    "bill {bill_id} is {}, not a draft",
                    bill.status.as_str()
                )));
            }
            self.storage.set_bill_status(bill_id, BillStatus::Open, now)?;
            match bill.submit_task {
                Some(task) => self.storage.enable(task, run_at, now)?,
                None => {
                    let task = self.storage.schedule(bill_id, run_at, true)?;
                    self.storage.link_submit_task(bill_id, task.id)?;
                }
            }
            Ok(self.storage.load_bill(bill_id)?)
        })?;

        info!(pr = bill.pull_request, bill = bill.id, %run_at, "bill published");
        Ok(bill)
    }

    /// A draft pull request was marked ready: publish its draft bill.
    pub fn ready_for_review(&self, number: i64, now: Timestamp) -> Result<Touched> {
        if self.storage.find_pull_request(number)?.is_none() {
            warn!(pr = number, "nothing changed: pull request not found");
            return Ok((None, None));
        }
        self.storage.set_pull_request_draft(number, false, now)?;
        let pr = self.storage.load_pull_request(number)?;

        match self.storage.live_bill_for_pull_request(number)? {
            Some(bill) if bill.status == BillStatus::Draft => {
                let bill = self.publish(bill.id, now)?;
                Ok((Some(pr), Some(bill)))
            }
            _ => {
                info!(pr = number, "no draft bill found");
                Ok((Some(pr), None))
            }
        }
    }

    /// Casts, changes, or retracts a user's vote.
    ///
    /// Voting the same way twice retracts the vote; voting the other way
    /// flips it. Only open bills accept votes.
    pub fn vote(
        &self,
        bill_id: i64,
        user_id: i64,
        support: bool,
        now: Timestamp,
    ) -> Result<VoteChange> {
        let (bill, user, change) = self.storage.atomically(|| -> Result<_> {
            let bill = self.storage.load_bill(bill_id)?;
            if bill.status != BillStatus::Open {
                return Err(BillError::ClosedBillVote(bill_id));
            }
            let user = self.storage.load_user(user_id)?;
            let vote = Vote {
                bill: bill_id,
                user: user_id,
                support,
                cast_at: now,
            };

            let change = match self.storage.load_vote(bill_id, user_id)? {
                None => {
                    self.storage.insert_vote(&vote)?;
                    VoteChange::Cast
                }
                Some(existing) if existing.support == support => {
                    self.storage.delete_vote(bill_id, user_id)?;
                    VoteChange::Retracted
                }
                Some(_) => {
                    self.storage.update_vote(&vote)?;
                    VoteChange::Changed
                }
            };
            Ok((bill, user, change))
        })?;

        info!(
            pr = bill.pull_request,
            bill = bill.id,
            user = %user.username,
            support,
            change = ?change,
            "vote recorded"
        );
        Ok(change)
    }

    /// Closes a draft or open bill and disables its submit task.
    pub fn close(&self, bill_id: i64, now: Timestamp) -> Result<Bill> {
        let bill = self.storage.atomically(|| -> Result<_> {
            let bill = self.storage.load_bill(bill_id)?;
            if bill.status.is_terminal() {
                return Err(BillError::Validation(format!(
                    "bill {bill_id} is already {}",
                    bill.status.as_str()
                )));
            }
            self.storage.set_bill_status(bill_id, BillStatus::Closed, now)?;
            if let Some(task) = bill.submit_task {
                self.storage.disable(task)?;
            }
            Ok(self.storage.load_bill(bill_id)?)
        })?;

        info!(pr = bill.pull_request, bill = bill.id, "bill closed; submit task disabled");
        Ok(bill)
    }

    /// A pull request was closed on GitHub: mark the mirror closed and close
    /// its live bill.
    pub fn close_pull_request(&self, number: i64, now: Timestamp) -> Result<Touched> {
        if self.storage.find_pull_request(number)?.is_none() {
            warn!(pr = number, "nothing changed: pull request not found");
            return Ok((None, None));
        }
        self.storage
            .set_pull_request_status(number, PullRequestStatus::Closed, now)?;
        let pr = self.storage.load_pull_request(number)?;

        let Some(bill) = self.storage.live_bill_for_pull_request(number)? else {
            info!(pr = number, "no open bill found");
            return Ok((Some(pr), None));
        };
        let bill = self.close(bill.id, now)?;
        Ok((Some(pr), Some(bill)))
    }

    /// Counts the votes on an open bill and records the outcome.
    ///
    /// A bill that is no longer open is returned unchanged, with
    /// `decided` false.
    pub fn submit(&self, bill_id: i64, now: Timestamp) -> Result<Submission> {
        self.storage.atomically(|| -> Result<_> {
            let bill = self.storage.load_bill(bill_id)?;
            if bill.status != BillStatus::Open {
                info!(
                    pr = bill.pull_request,
                    bill = bill.id,
                    status = bill.status.as_str(),
                    "bill was not open when submitted"
                );
                return Ok(Submission {
                    bill,
                    decided: false,
                });
            }

            let counts = self.storage.tally(bill_id)?;
            let outcome =
                tally::decide(counts.total, counts.yes, bill.constitutional, self.policy);
            let status = match outcome {
                Outcome::Failed => BillStatus::Failed,
                Outcome::Rejected => BillStatus::Rejected,
                Outcome::Approved => BillStatus::Approved,
            };
            self.storage.set_bill_status(bill_id, status, now)?;

            info!(
                pr = bill.pull_request,
                bill = bill.id,
                total = counts.total,
                approval = tally::approval_percent(counts.total, counts.yes),
                outcome = ?outcome,
                "bill submitted"
            );
            Ok(Submission {
                bill: self.storage.load_bill(bill_id)?,
                decided: true,
            })
        })
    }

    /// A bill with its vote counts and, given a viewer, that user's vote.
    pub fn summary(&self, bill_id: i64, viewer: Option<i64>) -> Result<BillSummary> {
        let bill = self.storage.load_bill(bill_id)?;
        self.summarize(bill, viewer)
    }

    /// Summaries of all bills, oldest first.
    pub fn summaries(
        &self,
        status: Option<BillStatus>,
        viewer: Option<i64>,
    ) -> Result<Vec<BillSummary>> {
        self.storage
            .list_bills(status)?
            .into_iter()
            .map(|bill| self.summarize(bill, viewer))
            .collect()
    }

    fn summarize(&self, bill: Bill, viewer: Option<i64>) -> Result<BillSummary> {
        let counts = self.storage.tally(bill.id)?;
        let user_vote = match viewer {
            Some(user) => self.storage.load_vote(bill.id, user)?.map(|v| v.support),
            None => None,
        };
        Ok(BillSummary {
            bill,
            total_votes: counts.total,
            yes_count: counts.yes,
            no_count: counts.no(),
            user_vote,
        })
    }

    fn ensure_no_live_bill(&self, number: i64) -> Result<()> {
        match self.storage.live_bill_for_pull_request(number)? {
            Some(bill) => Err(BillError::Validation(format!(
                "a bill for pull request #{number} is already {} (bill {})",
                bill.status.as_str(),
                bill.id
            ))),
            None => Ok(()),
        }
    }

    /// When a vote starting at `now` closes.
    fn deadline(&self, now: Timestamp) -> Result<Timestamp> {
        now.checked_add(self.policy.voting_period)
            .map_err(|e| BillError::Validation(format!("voting period out of range: {e}")))
    }
}

/// The local mirror of the pull request an event describes.
fn mirror(event: &PullRequestEvent, now: Timestamp) -> Result<PullRequest> {
    let status = PullRequestStatus::parse(&event.state).ok_or_else(|| {
        BillError::Validation(format!("unknown pull request state: {}", event.state))
    })?;
    Ok(PullRequest {
        number: event.number,
        title: event.title.clone(),
        additions: event.additions,
        deletions: event.deletions,
        diff_url: event.diff_url.clone(),
        author_name: event.author_login.clone(),
        status,
        sha: event.sha.clone(),
        draft: event.draft,
        created: now,
        modified: now,
    })
}

/// Shared fixtures for exercising the lifecycle against a fake host.
#[cfg(test)]
pub(crate) mod harness {
    use jiff::SignedDuration;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        constitution::{LineRange, Protection, ProtectionMap},
        github::fake::FakeHost,
    };

    /// Edits `readme.md`, which nothing protects.
    pub const ORDINARY_DIFF: &str = "diff --git a/readme.md b/readme.md
--- a/readme.md
+++ b/readme.md
@@ -1,2 +1,3 @@
 # Readme
+A new line.
 The end.
";

    /// Edits line 2 of `charter.py`, whose lines 1-5 are protected.
    pub const AMENDING_DIFF: &str = "diff --git a/charter.py b/charter.py
--- a/charter.py
+++ b/charter.py
@@ -1,3 +1,3 @@
 first = 1
-second = 2
+second = 3
 third = 3
";

    /// Adds a line at the top of `notes.md`, moving its protected lines
    /// 40-45 without touching them.
    pub const SHIFTING_DIFF: &str = "diff --git a/notes.md b/notes.md
--- a/notes.md
+++ b/notes.md
@@ -1,2 +1,3 @@
+Preface.
 # Notes
 The end.
";

    pub struct Harness {
        pub _dir: TempDir,
        pub storage: Storage,
        pub host: FakeHost,
        pub registry: ProtectionRegistry,
        pub policy: VotingPolicy,
    }

    impl Harness {
        pub fn new(diff: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let registry = ProtectionRegistry::new(dir.path().join("constitution.json"));
            registry
                .write(&ProtectionMap::from([
                    (
                        "charter.py".to_string(),
                        Protection::Lines(vec![LineRange::new(1, 5)]),
                    ),
                    (
                        "notes.md".to_string(),
                        Protection::Lines(vec![LineRange::new(40, 45)]),
                    ),
                ]))
                .unwrap();
            Self {
                _dir: dir,
                storage: Storage::open_in_memory().unwrap(),
                host: FakeHost::with_diff(diff),
                registry,
                policy: VotingPolicy::default(),
            }
        }

        pub fn lifecycle(&self) -> Lifecycle<'_, FakeHost> {
            Lifecycle::new(&self.storage, &self.host, &self.registry, &self.policy)
        }

        /// Registers `n` voters and returns their ids.
        pub fn voters(&self, n: usize) -> Vec<i64> {
            (0..n)
                .map(|i| {
                    self.storage
                        .create_user(&format!("voter{i}"), &format!("9{i:03}"))
                        .unwrap()
                        .id
                })
                .collect()
        }

        /// Registers the author and opens pull request `number` as a bill.
        pub fn open_bill(&self, number: i64, draft: bool, now: Timestamp) -> Bill {
            if self.storage.find_user_by_github_id("1001").unwrap().is_none() {
                self.storage.create_user("alice", "1001").unwrap();
            }
            let (_, bill) = self
                .lifecycle()
                .open_pull_request(&event(number, "1001", draft), now)
                .unwrap();
            bill.unwrap()
        }
    }

    pub fn event(number: i64, author_id: &str, draft: bool) -> PullRequestEvent {
        PullRequestEvent {
            number,
            title: format!("Change #{number}"),
            additions: 1,
            deletions: 0,
            diff_url: format!("https://github.com/owner/repo/pull/{number}.diff"),
            author_login: "alice".into(),
            author_id: author_id.into(),
            sha: format!("{number:040x}"),
            state: "open".into(),
            draft,
            body: "Why this matters.".into(),
        }
    }

    pub fn at(seconds: i64) -> Timestamp {
        Timestamp::new(seconds, 0).unwrap()
    }

    pub fn after_voting(start: Timestamp) -> Timestamp {
        start + VotingPolicy::default().voting_period + SignedDuration::from_secs(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use super::harness::*;

    #[test]
    fn opened_by_known_user_creates_open_bill() {
        let h = Harness::new(ORDINARY_DIFF);
        h.storage.create_user("alice", "1001").unwrap();
        let now = at(1_000_000);

        let (pr, bill) = h
            .lifecycle()
            .open_pull_request(&event(7, "1001", false), now)
            .unwrap();
        let bill = bill.unwrap();

        assert_eq!(pr.number, 7);
        assert_eq!(bill.status, BillStatus::Open);
        assert!(!bill.constitutional);
        assert_eq!(bill.name, "Change #7");
        assert_eq!(bill.description, "Why this matters.");

        let task = h.storage.load_task(bill.submit_task.unwrap()).unwrap();
        assert!(task.enabled);
        assert_eq!(task.run_at, now + h.policy.voting_period);
        assert_eq!(h.host.calls(), ["refresh", "diff #7"]);
    }

    #[test]
    fn amendment_pulled_before_opening_is_honoured() {
        let h = Harness::new(ORDINARY_DIFF);
        *h.host.upstream.borrow_mut() = Some((
            h.registry.path().to_path_buf(),
            "{\"readme.md\": null}\n".to_string(),
        ));

        let bill = h.open_bill(7, false, at(0));

        assert!(bill.constitutional);
        assert_eq!(h.host.calls(), ["refresh", "diff #7"]);
    }

    #[test]
    fn unknown_author_gets_no_bill() {
        let h = Harness::new(ORDINARY_DIFF);

        let (pr, bill) = h
            .lifecycle()
            .open_pull_request(&event(7, "404", false), at(0))
            .unwrap();

        assert_eq!(pr.number, 7);
        assert!(bill.is_none());
        assert!(h.storage.load_pull_request(7).is_ok());
        assert!(h.host.calls().is_empty());
    }

    #[test]
    fn amending_diff_makes_constitutional_bill() {
        let h = Harness::new(AMENDING_DIFF);

        let bill = h.open_bill(3, false, at(0));

        assert!(bill.constitutional);
    }

    #[test]
    fn draft_pull_request_creates_draft_bill_with_idle_task() {
        let h = Harness::new(ORDINARY_DIFF);

        let bill = h.open_bill(5, true, at(0));

        assert_eq!(bill.status, BillStatus::Draft);
        let task = h.storage.load_task(bill.submit_task.unwrap()).unwrap();
        assert!(!task.enabled);
    }

    #[test]
    fn second_live_bill_for_same_pull_request_is_rejected() {
        let h = Harness::new(ORDINARY_DIFF);
        h.open_bill(7, false, at(0));

        let err = h
            .lifecycle()
            .open_pull_request(&event(7, "1001", false), at(10))
            .unwrap_err();

        assert!(matches!(err, BillError::Validation(_)));
        assert_eq!(h.storage.list_bills(None).unwrap().len(), 1);
    }

    #[test]
    fn reopening_after_close_creates_fresh_bill() {
        let h = Harness::new(ORDINARY_DIFF);
        let first = h.open_bill(7, false, at(0));
        h.lifecycle().close_pull_request(7, at(5)).unwrap();

        let second = h.open_bill(7, false, at(10));

        assert_ne!(first.id, second.id);
        assert_eq!(h.storage.load_bill(first.id).unwrap().status, BillStatus::Closed);
    }

    #[test]
    fn missing_constitution_fails_without_creating_bill() {
        let h = Harness::new(ORDINARY_DIFF);
        std::fs::remove_file(h.registry.path()).unwrap();
        h.storage.create_user("alice", "1001").unwrap();

        let err = h
            .lifecycle()
            .open_pull_request(&event(7, "1001", false), at(0))
            .unwrap_err();

        assert!(matches!(
            err,
            BillError::Constitution(ConstitutionError::NotFound(_))
        ));
        assert!(h.storage.list_bills(None).unwrap().is_empty());
    }

    #[test]
    fn host_failure_is_external_error() {
        let h = Harness::new(ORDINARY_DIFF);
        h.storage.create_user("alice", "1001").unwrap();
        h.host.fail.set(true);

        let err = h
            .lifecycle()
            .open_pull_request(&event(7, "1001", false), at(0))
            .unwrap_err();

        assert!(matches!(err, BillError::External(_)));
    }

    #[test]
    fn publish_opens_draft_and_restarts_the_clock() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(5, true, at(0));
        let later = at(50_000);

        let bill = h.lifecycle().publish(bill.id, later).unwrap();

        assert_eq!(bill.status, BillStatus::Open);
        let task = h.storage.load_task(bill.submit_task.unwrap()).unwrap();
        assert!(task.enabled);
        assert_eq!(task.run_at, later + h.policy.voting_period);
        assert_eq!(task.last_run_at, Some(later));
    }

    #[test]
    fn publish_rejects_non_draft() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(5, false, at(0));

        let err = h.lifecycle().publish(bill.id, at(1)).unwrap_err();

        assert!(matches!(err, BillError::Validation(_)));
    }

    #[test]
    fn ready_for_review_publishes_draft_bill() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(5, true, at(0));

        let (pr, published) = h.lifecycle().ready_for_review(5, at(100)).unwrap();

        assert!(!pr.unwrap().draft);
        let published = published.unwrap();
        assert_eq!(published.id, bill.id);
        assert_eq!(published.status, BillStatus::Open);
    }

    #[test]
    fn ready_for_review_on_unknown_pull_request_is_noop() {
        let h = Harness::new(ORDINARY_DIFF);

        let touched = h.lifecycle().ready_for_review(99, at(0)).unwrap();

        assert!(touched.0.is_none() && touched.1.is_none());
    }

    #[test]
    fn vote_toggles() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));
        let voter = h.voters(1)[0];
        let lifecycle = h.lifecycle();

        assert_eq!(lifecycle.vote(bill.id, voter, true, at(1)).unwrap(), VoteChange::Cast);
        assert_eq!(lifecycle.summary(bill.id, None).unwrap().total_votes, 1);

        assert_eq!(
            lifecycle.vote(bill.id, voter, true, at(2)).unwrap(),
            VoteChange::Retracted
        );
        assert_eq!(lifecycle.summary(bill.id, None).unwrap().total_votes, 0);
    }

    #[test]
    fn vote_flips_without_double_counting() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));
        let voter = h.voters(1)[0];
        let lifecycle = h.lifecycle();

        lifecycle.vote(bill.id, voter, true, at(1)).unwrap();
        let change = lifecycle.vote(bill.id, voter, false, at(2)).unwrap();

        assert_eq!(change, VoteChange::Changed);
        let summary = lifecycle.summary(bill.id, Some(voter)).unwrap();
        assert_eq!(summary.total_votes, 1);
        assert_eq!(summary.no_count, 1);
        assert_eq!(summary.user_vote, Some(false));
        let vote = h.storage.load_vote(bill.id, voter).unwrap().unwrap();
        assert_eq!(vote.cast_at, at(2));
    }

    #[test]
    fn vote_on_draft_or_closed_bill_fails() {
        let h = Harness::new(ORDINARY_DIFF);
        let draft = h.open_bill(5, true, at(0));
        let voter = h.voters(1)[0];

        let err = h.lifecycle().vote(draft.id, voter, true, at(1)).unwrap_err();
        assert!(matches!(err, BillError::ClosedBillVote(id) if id == draft.id));

        let open = h.open_bill(6, false, at(0));
        h.lifecycle().close(open.id, at(2)).unwrap();
        let err = h.lifecycle().vote(open.id, voter, true, at(3)).unwrap_err();
        assert!(matches!(err, BillError::ClosedBillVote(_)));
    }

    #[test]
    fn vote_by_unknown_user_is_not_found() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));

        let err = h.lifecycle().vote(bill.id, 4242, true, at(1)).unwrap_err();

        assert!(matches!(err, BillError::NotFound(_)));
    }

    #[test]
    fn close_disables_task_and_rejects_terminal_bills() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));

        let closed = h.lifecycle().close(bill.id, at(1)).unwrap();

        assert_eq!(closed.status, BillStatus::Closed);
        let task = h.storage.load_task(bill.submit_task.unwrap()).unwrap();
        assert!(!task.enabled);
        assert!(matches!(
            h.lifecycle().close(bill.id, at(2)).unwrap_err(),
            BillError::Validation(_)
        ));
    }

    #[test]
    fn close_pull_request_closes_mirror_and_bill() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));

        let (pr, closed) = h.lifecycle().close_pull_request(7, at(1)).unwrap();

        assert_eq!(pr.unwrap().status, PullRequestStatus::Closed);
        assert_eq!(closed.unwrap().id, bill.id);
    }

    #[test]
    fn submit_below_quorum_fails() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));
        for voter in h.voters(4) {
            h.lifecycle().vote(bill.id, voter, true, at(1)).unwrap();
        }

        let bill = h.lifecycle().submit(bill.id, at(2)).unwrap().bill;

        assert_eq!(bill.status, BillStatus::Failed);
    }

    #[test]
    fn submit_at_exact_normal_majority_is_rejected() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));
        for (i, voter) in h.voters(6).into_iter().enumerate() {
            h.lifecycle().vote(bill.id, voter, i < 3, at(1)).unwrap();
        }

        let bill = h.lifecycle().submit(bill.id, at(2)).unwrap().bill;

        assert_eq!(bill.status, BillStatus::Rejected);
    }

    #[test]
    fn submit_with_majority_approves() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));
        for (i, voter) in h.voters(5).into_iter().enumerate() {
            h.lifecycle().vote(bill.id, voter, i < 3, at(1)).unwrap();
        }

        let bill = h.lifecycle().submit(bill.id, at(2)).unwrap().bill;

        assert_eq!(bill.status, BillStatus::Approved);
    }

    #[test]
    fn constitutional_bill_needs_supermajority() {
        let h = Harness::new(AMENDING_DIFF);
        let bill = h.open_bill(3, false, at(0));
        for (i, voter) in h.voters(6).into_iter().enumerate() {
            h.lifecycle().vote(bill.id, voter, i < 4, at(1)).unwrap();
        }

        let bill = h.lifecycle().submit(bill.id, at(2)).unwrap().bill;

        assert_eq!(bill.status, BillStatus::Rejected);
    }

    #[test]
    fn submit_on_closed_bill_is_noop() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));
        h.lifecycle().close(bill.id, at(1)).unwrap();

        let submitted = h.lifecycle().submit(bill.id, at(2)).unwrap();

        assert!(!submitted.decided);
        assert_eq!(submitted.bill.status, BillStatus::Closed);
    }

    #[test]
    fn second_submit_decides_nothing() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));

        let first = h.lifecycle().submit(bill.id, at(2)).unwrap();
        let second = h.lifecycle().submit(bill.id, at(3)).unwrap();

        assert!(first.decided);
        assert!(!second.decided);
        assert_eq!(second.bill.status, BillStatus::Failed);
        assert_eq!(second.bill.modified, first.bill.modified);
    }

    #[test]
    fn summaries_report_each_bill() {
        let h = Harness::new(ORDINARY_DIFF);
        let first = h.open_bill(1, false, at(0));
        let second = h.open_bill(2, false, at(0));
        let voter = h.voters(1)[0];
        h.lifecycle().vote(second.id, voter, true, at(1)).unwrap();

        let summaries = h.lifecycle().summaries(None, Some(voter)).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].bill.id, first.id);
        assert_eq!(summaries[0].user_vote, None);
        assert_eq!(summaries[1].bill.id, second.id);
        assert_eq!(summaries[1].user_vote, Some(true));
        assert!((summaries[1].yes_percent() - 100.0).abs() < f64::EPSILON);
    }
}
