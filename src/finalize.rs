//! What happens when a bill's voting period ends.

use jiff::Timestamp;
use tracing::{debug, info};

use crate::{
    constitution::{self, ConstitutionError},
    github::PullRequestHost,
    lifecycle::{Lifecycle, Result, Submission},
    model::{Bill, BillStatus, PullRequest},
};

/// Decides a bill and carries the decision out on GitHub.
///
/// A bill that is not approved has its pull request closed. An approved bill
/// is squash-merged at the commit that was voted on; if it was not a
/// constitutional amendment, protected ranges it shifted are rebased and
/// the updated document is pushed.
///
/// Only the call that decides the bill merges or rebases. A bill decided
/// earlier is left alone, except that a bill closed before its vote ended
/// still has its pull request closed.
pub fn submit_bill<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    bill_id: i64,
    now: Timestamp,
) -> Result<Bill> {
    let Submission { bill, decided } = lifecycle.submit(bill_id, now)?;
    if !decided && bill.status != BillStatus::Closed {
        info!(
            pr = bill.pull_request,
            bill = bill.id,
            status = bill.status.as_str(),
            "nothing to carry out"
        );
        return Ok(bill);
    }

    let pr = lifecycle.storage().load_pull_request(bill.pull_request)?;
    let host = lifecycle.host();

    if bill.status != BillStatus::Approved {
        host.close(&pr)?;
        info!(
            pr = pr.number,
            bill = bill.id,
            status = bill.status.as_str(),
            "pull request closed"
        );
        return Ok(bill);
    }

    host.merge(&pr)?;
    info!(pr = pr.number, bill = bill.id, sha = %pr.sha, "pull request merged");

    // An amendment edits the protection document by hand.
    if !bill.constitutional {
        rebase_constitution(lifecycle, &pr)?;
    }
    Ok(bill)
}

/// Shifts protected ranges to follow a merged pull request and publishes
/// the result. Returns whether anything moved.
fn rebase_constitution<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    pr: &PullRequest,
) -> Result<bool> {
    let host = lifecycle.host();
    let registry = lifecycle.registry();

    host.refresh()?;
    let diff = host.fetch_diff(pr)?;
    let protection = registry.read()?;
    let Some(updated) =
        constitution::update_constitution(&diff, &protection).map_err(ConstitutionError::from)?
    else {
        debug!(pr = pr.number, "constitution unaffected");
        return Ok(false);
    };

    registry.write(&updated)?;
    host.publish_constitution(
        registry.path(),
        &format!("Update Constitution for PR #{}", pr.number),
    )?;
    info!(pr = pr.number, "constitution updated");
    Ok(true)
}
