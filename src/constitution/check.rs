//! Deciding which files in a diff touch protected lines.

use super::{DiffError, Hunk, LineRange, Protection, ProtectionMap, parse};

/// Context lines `git diff` shows around each edit.
const CONTEXT_LINES: i64 = 3;

/// Hunks at least this long carry trailing context; shorter ones are
/// assumed to have reached the end of the file.
const HUNK_MIN_LENGTH: i64 = 7;

/// Paths of files whose protected content the diff changes.
///
/// Deleted, renamed, and wholly protected files match as soon as they
/// appear. Otherwise a file matches if any hunk's edited interval meets one
/// of its protected ranges. Paths are returned in diff order, once per
/// matching file section; a non-empty result makes the change a
/// constitutional amendment.
pub fn is_constitutional(
    diff: &str,
    protection: &ProtectionMap,
) -> Result<Vec<String>, DiffError> {
    let mut matched: Vec<String> = Vec::new();

    for file in parse(diff)? {
        let path = if file.is_rename {
            file.source_path()
        } else {
            file.path()
        };
        let Some(locks) = protection.get(path) else {
            continue;
        };

        let touched = file.is_removed_file()
            || file.is_rename
            || match locks {
                Protection::WholeFile => true,
                Protection::Lines(ranges) => check_hunks(&file.hunks, ranges),
            };

        // A file the diff lists twice is reported twice.
        if touched {
            matched.push(path.to_string());
        }
    }

    Ok(matched)
}

/// Whether any hunk's edited lines overlap any protected range.
fn check_hunks(hunks: &[Hunk], ranges: &[LineRange]) -> bool {
    hunks.iter().any(|hunk| {
        let (start, end) = edited_interval(hunk);
        ranges.iter().any(|lock| {
            lock.contains(start) || lock.contains(end) || (start <= lock.start && lock.end <= end)
        })
    })
}

/// Pre-edit line interval a hunk actually edits, with context stripped.
///
/// An approximation: it cannot tell context from edits in very short
/// hunks, and leans toward treating ambiguous boundary lines as edited.
fn edited_interval(hunk: &Hunk) -> (i64, i64) {
    // A hunk starting at line 1 has no leading context.
    let start = if hunk.source_start == 1 {
        1
    } else {
        hunk.source_start + CONTEXT_LINES
    };

    let mut end = start + hunk.source_length - 1;
    if start != 1 {
        end -= CONTEXT_LINES;
    }
    if hunk.source_length >= HUNK_MIN_LENGTH {
        end -= CONTEXT_LINES;
    }

    (start, end)
}
