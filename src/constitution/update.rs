//! Following protected lines as unrelated edits move them.

use super::{DiffError, Protection, ProtectionMap, parse};

/// Shift protected ranges to account for edits made above them.
///
/// If the constitution protects lines 9–10 of `foo.py` and a change adds a
/// line between 4 and 5, the change is not an amendment, so the ranges move
/// to 10–11 to keep covering the same code.
///
/// Each hunk moves every range that currently starts after the hunk's
/// source start by the hunk's net line count. Returns `None` when no range
/// needed to move, so callers can skip the write.
///
/// Meant for diffs already known not to be constitutional; protected
/// ranges of an amendment are maintained by hand.
pub fn update_constitution(
    diff: &str,
    protection: &ProtectionMap,
) -> Result<Option<ProtectionMap>, DiffError> {
    let mut updated = protection.clone();
    let mut changed = false;

    for file in parse(diff)? {
        let Some(Protection::Lines(ranges)) = updated.get_mut(file.path()) else {
            continue;
        };
        for hunk in &file.hunks {
            let delta = hunk.added() - hunk.removed();
            for range in ranges.iter_mut() {
                if hunk.source_start < range.start {
                    changed = true;
                    range.shift(delta);
                }
            }
        }
    }

    Ok(changed.then_some(updated))
}
