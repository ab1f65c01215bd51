//! Durable submit tasks: when each bill's vote closes.
//!
//! Each bill owns one task. Tasks are soft-cancelled by disabling them, and
//! a task runs at most once per enable: [`run_due`] claims it, disabling
//! it, before submitting the bill. Overlapping runs cannot both claim it.

use jiff::Timestamp;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    finalize,
    github::PullRequestHost,
    lifecycle::Lifecycle,
    model::{BillStatus, SubmitTask},
    storage::StorageError,
};

/// A store of submit tasks.
pub trait Scheduler {
    /// Creates a task that submits `bill` at `run_at`.
    fn schedule(
        &self,
        bill: i64,
        run_at: Timestamp,
        enabled: bool,
    ) -> Result<SubmitTask, StorageError>;

    /// Re-arms a task for `run_at`.
    fn enable(
        &self,
        task: Uuid,
        run_at: Timestamp,
        last_run_at: Timestamp,
    ) -> Result<(), StorageError>;

    /// Stops a task from firing without deleting it.
    fn disable(&self, task: Uuid) -> Result<(), StorageError>;

    /// Enabled tasks whose time has come, soonest first.
    fn due(&self, now: Timestamp) -> Result<Vec<SubmitTask>, StorageError>;

    /// Disables an enabled task and records when it ran, in one step.
    ///
    /// Returns false if the task was not enabled, e.g. because an
    /// overlapping run already claimed it.
    fn claim(&self, task: Uuid, now: Timestamp) -> Result<bool, StorageError>;
}

/// The result of firing one task.
#[derive(Debug)]
pub struct Fired {
    pub task: Uuid,
    pub bill: i64,

    /// The bill's status afterwards, or why submitting it failed.
    pub outcome: Result<BillStatus, String>,
}

/// Fires every due task once.
///
/// A failure to submit one bill is logged and reported in its [`Fired`]
/// entry; the remaining tasks still run. Failed tasks are not retried.
pub fn run_due<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    now: Timestamp,
) -> Result<Vec<Fired>, StorageError> {
    let mut fired = Vec::new();
    for task in lifecycle.storage().due(now)? {
        fired.extend(fire(lifecycle, &task, now)?);
    }
    Ok(fired)
}

/// Claims `task` and submits its bill. `None` if another run got it first.
fn fire<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    task: &SubmitTask,
    now: Timestamp,
) -> Result<Option<Fired>, StorageError> {
    if !lifecycle.storage().claim(task.id, now)? {
        debug!(task = %task.id, bill = task.bill, "submit task already claimed");
        return Ok(None);
    }
    info!(task = %task.id, bill = task.bill, "submit task fired");

    let outcome = finalize::submit_bill(lifecycle, task.bill, now)
        .map(|bill| bill.status)
        .map_err(|e| {
            error!(task = %task.id, bill = task.bill, error = %e, "submit failed");
            e.to_string()
        });
    Ok(Some(Fired {
        task: task.id,
        bill: task.bill,
        outcome,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        constitution::{LineRange, Protection},
        lifecycle::harness::*,
    };

    #[test]
    fn nothing_due_before_voting_ends() {
        let h = Harness::new(ORDINARY_DIFF);
        h.open_bill(7, false, at(0));

        let fired = run_due(&h.lifecycle(), at(60)).unwrap();

        assert!(fired.is_empty());
        assert!(h.host.calls().iter().all(|c| !c.starts_with("close")));
    }

    #[test]
    fn due_task_submits_bill_once() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));
        let end = after_voting(at(0));

        let fired = run_due(&h.lifecycle(), end).unwrap();

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].bill, bill.id);
        assert_eq!(fired[0].outcome, Ok(BillStatus::Failed));
        let task = h.storage.load_task(bill.submit_task.unwrap()).unwrap();
        assert!(!task.enabled);
        assert_eq!(task.last_run_at, Some(end));

        assert!(run_due(&h.lifecycle(), end).unwrap().is_empty());
    }

    #[test]
    fn overlapping_runs_fire_a_task_once() {
        let h = Harness::new(SHIFTING_DIFF);
        let bill = h.open_bill(7, false, at(0));
        for voter in h.voters(5) {
            h.lifecycle().vote(bill.id, voter, true, at(1)).unwrap();
        }
        let end = after_voting(at(0));

        // Both runs see the task as due before either claims it.
        let first = h.storage.due(end).unwrap();
        let second = h.storage.due(end).unwrap();
        let lifecycle = h.lifecycle();

        assert!(fire(&lifecycle, &first[0], end).unwrap().is_some());
        assert!(fire(&lifecycle, &second[0], end).unwrap().is_none());

        let calls = h.host.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("merge")).count(), 1, "{calls:?}");
        assert_eq!(
            h.registry.read().unwrap()["notes.md"],
            Protection::Lines(vec![LineRange::new(41, 46)])
        );
    }

    #[test]
    fn draft_bill_task_never_fires() {
        let h = Harness::new(ORDINARY_DIFF);
        h.open_bill(5, true, at(0));

        assert!(run_due(&h.lifecycle(), after_voting(at(0))).unwrap().is_empty());
    }

    #[test]
    fn closed_pull_request_leaves_nothing_to_fire() {
        let h = Harness::new(ORDINARY_DIFF);
        let bill = h.open_bill(7, false, at(0));
        h.lifecycle().close_pull_request(7, at(10)).unwrap();

        assert!(run_due(&h.lifecycle(), after_voting(at(0))).unwrap().is_empty());

        // Fired by hand anyway, the submit changes nothing.
        let submitted = h.lifecycle().submit(bill.id, after_voting(at(0))).unwrap();
        assert!(!submitted.decided);
        assert_eq!(submitted.bill.status, BillStatus::Closed);
    }

    #[test]
    fn failures_are_reported_and_other_tasks_still_run() {
        let h = Harness::new(ORDINARY_DIFF);
        h.open_bill(1, false, at(0));
        h.open_bill(2, false, at(10));
        h.host.fail.set(true);

        let fired = run_due(&h.lifecycle(), after_voting(at(10))).unwrap();

        assert_eq!(fired.len(), 2);
        assert!(fired.iter().all(|f| f.outcome.is_err()));
        for f in &fired {
            assert_eq!(h.storage.load_bill(f.bill).unwrap().status, BillStatus::Failed);
        }
    }
}
