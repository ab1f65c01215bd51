//! Output formatting for CLI display.

use crate::{model::BillSummary, schedule::Fired};

/// One line per bill, for `bill list`.
pub(super) fn format_bill_line(summary: &BillSummary) -> String {
    let bill = &summary.bill;
    let mut line = format!(
        "{:>4}  [{}]  PR #{}  {} yes / {} no  {}",
        bill.id,
        bill.status.label(),
        bill.pull_request,
        summary.yes_count,
        summary.no_count,
        bill.name
    );
    if bill.constitutional {
        line.push_str("  (constitutional)");
    }
    if let Some(vote) = summary.user_vote {
        line.push_str(&format!("  you: {}", yes_no(vote)));
    }
    line
}

/// The full picture of one bill, for `bill show`.
pub(super) fn format_bill_detail(summary: &BillSummary) -> String {
    let bill = &summary.bill;
    let mut lines = vec![
        format!("Bill {}: {}", bill.id, bill.name),
        format!("Status:          {}", bill.status.label()),
        format!("Pull request:    #{}", bill.pull_request),
        format!(
            "Constitutional:  {}",
            if bill.constitutional { "yes" } else { "no" }
        ),
        format!(
            "Votes:           {} yes ({:.1}%), {} no ({:.1}%)",
            summary.yes_count,
            summary.yes_percent(),
            summary.no_count,
            summary.no_percent()
        ),
    ];
    if let Some(vote) = summary.user_vote {
        lines.push(format!("Your vote:       {}", yes_no(vote)));
    }
    lines.push(format!("Created:         {}", bill.created));
    lines.push(format!("Modified:        {}", bill.modified));
    if !bill.description.is_empty() {
        lines.push(String::new());
        lines.push(bill.description.clone());
    }
    lines.join("\n")
}

/// One line per fired task, for `tick`.
pub(super) fn format_fired(fired: &Fired) -> String {
    match &fired.outcome {
        Ok(status) => format!("bill {}: {}", fired.bill, status.label()),
        Err(e) => format!("bill {}: submit failed: {e}", fired.bill),
    }
}

fn yes_no(support: bool) -> &'static str {
    if support { "yes" } else { "no" }
}
