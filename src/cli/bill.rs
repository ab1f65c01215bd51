//! Bill commands: list, show, vote, publish, close.

use clap::{Subcommand, ValueEnum};
use jiff::Timestamp;

use crate::{
    github::PullRequestHost,
    lifecycle::Lifecycle,
    model::{BillStatus, VoteChange},
};

use super::format::{format_bill_detail, format_bill_line};

#[derive(Debug, Subcommand)]
pub enum BillCommand {
    /// List bills, oldest first.
    List {
        /// Only bills with this status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Show this user's vote on each bill.
        #[arg(long = "as")]
        viewer: Option<String>,
    },

    /// Show one bill with its vote counts.
    Show {
        id: i64,

        /// Show this user's vote.
        #[arg(long = "as")]
        viewer: Option<String>,
    },

    /// Vote on an open bill.
    ///
    /// Voting the same way again retracts the vote; voting the other way
    /// changes it.
    Vote {
        id: i64,

        /// The voting user.
        #[arg(long = "as")]
        voter: String,

        #[arg(value_enum)]
        choice: VoteArg,
    },

    /// Open a draft bill for voting. The voting period starts now.
    Publish { id: i64 },

    /// Close a draft or open bill without a vote.
    Close { id: i64 },
}

/// CLI-facing bill status, mapped to the domain `BillStatus`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Draft,
    Open,
    Approved,
    Rejected,
    Failed,
    Closed,
}

impl StatusArg {
    fn to_domain(self) -> BillStatus {
        match self {
            Self::Draft => BillStatus::Draft,
            Self::Open => BillStatus::Open,
            Self::Approved => BillStatus::Approved,
            Self::Rejected => BillStatus::Rejected,
            Self::Failed => BillStatus::Failed,
            Self::Closed => BillStatus::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VoteArg {
    Yes,
    No,
}

pub(super) fn run<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    command: &BillCommand,
) -> Result<(), String> {
    match command {
        BillCommand::List { status, viewer } => {
            let viewer = resolve_user(lifecycle, viewer.as_deref())?;
            cmd_list(lifecycle, status.map(StatusArg::to_domain), viewer)
        }
        BillCommand::Show { id, viewer } => {
            let viewer = resolve_user(lifecycle, viewer.as_deref())?;
            let summary = lifecycle.summary(*id, viewer).map_err(|e| e.to_string())?;
            println!("{}", format_bill_detail(&summary));
            Ok(())
        }
        BillCommand::Vote { id, voter, choice } => {
            let user = resolve_user(lifecycle, Some(voter))?.ok_or("a voter is required")?;
            cmd_vote(lifecycle, *id, user, matches!(choice, VoteArg::Yes))
        }
        BillCommand::Publish { id } => {
            let bill = lifecycle
                .publish(*id, Timestamp::now())
                .map_err(|e| format!("failed to publish bill {id}: {e}"))?;
            println!("bill {} is open for voting", bill.id);
            Ok(())
        }
        BillCommand::Close { id } => {
            let bill = lifecycle
                .close(*id, Timestamp::now())
                .map_err(|e| format!("failed to close bill {id}: {e}"))?;
            println!("bill {} closed", bill.id);
            Ok(())
        }
    }
}

/// Look up a user ID by username.
fn resolve_user<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    username: Option<&str>,
) -> Result<Option<i64>, String> {
    let Some(username) = username else {
        return Ok(None);
    };
    let user = lifecycle
        .storage()
        .find_user(username)
        .map_err(|e| e.to_string())?;
    Ok(Some(user.id))
}

fn cmd_list<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    status: Option<BillStatus>,
    viewer: Option<i64>,
) -> Result<(), String> {
    let summaries = lifecycle
        .summaries(status, viewer)
        .map_err(|e| format!("failed to list bills: {e}"))?;

    if summaries.is_empty() {
        println!("No bills");
        return Ok(());
    }
    for s in &summaries {
        println!("{}", format_bill_line(s));
    }
    Ok(())
}

fn cmd_vote<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    id: i64,
    user: i64,
    support: bool,
) -> Result<(), String> {
    let change = lifecycle
        .vote(id, user, support, Timestamp::now())
        .map_err(|e| format!("failed to vote on bill {id}: {e}"))?;

    let side = if support { "yes" } else { "no" };
    match change {
        VoteChange::Cast => println!("voted {side} on bill {id}"),
        VoteChange::Changed => println!("changed vote to {side} on bill {id}"),
        VoteChange::Retracted => println!("retracted vote on bill {id}"),
    }
    Ok(())
}
