//! The constitution: protected line ranges in the governed repository.
//!
//! The protection document maps each file path to the line ranges that
//! only a constitutional (supermajority) bill may change, or to `null`
//! when the whole file is protected:
//!
//! ```text
//! {
//!   "constitution.json": null,
//!   "src/tally.rs": [[1, 40], [77, 100]]
//! }
//! ```
//!
//! [`is_constitutional`] decides which files in a diff touch protected
//! lines. [`update_constitution`] shifts protected ranges to follow edits
//! made above them, so incidental line drift never needs a manual
//! amendment.

mod check;
mod diff;
mod registry;
mod update;

use std::{fmt, io, path::PathBuf};

use serde::{Deserialize, Serialize};

pub use check::is_constitutional;
pub use diff::{DiffError, Hunk, LineKind, PatchedFile, parse};
pub use registry::{ProtectionRegistry, to_json, validate};
pub use update::update_constitution;

/// Errors from reading, validating, or applying the protection document.
#[derive(Debug, thiserror::Error)]
pub enum ConstitutionError {
    #[error("protection document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid range {range} for {path}: {reason}")]
    InvalidRange {
        path: String,
        range: LineRange,
        reason: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),
}

/// A protected line interval: 1-indexed, inclusive on both ends.
///
/// Serialized as a two-element array, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct LineRange {
    pub start: i64,
    pub end: i64,
}

impl LineRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Whether `line` falls inside the range.
    pub fn contains(&self, line: i64) -> bool {
        self.start <= line && line <= self.end
    }

    /// Moves both ends by `delta`, keeping the length.
    pub fn shift(&mut self, delta: i64) {
        self.start += delta;
        self.end += delta;
    }
}

impl From<[i64; 2]> for LineRange {
    fn from([start, end]: [i64; 2]) -> Self {
        Self { start, end }
    }
}

impl From<LineRange> for [i64; 2] {
    fn from(range: LineRange) -> Self {
        [range.start, range.end]
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// How much of a file is protected.
///
/// Serialized as `null` for the whole file, or an array of ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<LineRange>>", into = "Option<Vec<LineRange>>")]
pub enum Protection {
    WholeFile,
    Lines(Vec<LineRange>),
}

impl From<Option<Vec<LineRange>>> for Protection {
    fn from(value: Option<Vec<LineRange>>) -> Self {
        value.map_or(Self::WholeFile, Self::Lines)
    }
}

impl From<Protection> for Option<Vec<LineRange>> {
    fn from(value: Protection) -> Self {
        match value {
            Protection::WholeFile => None,
            Protection::Lines(ranges) => Some(ranges),
        }
    }
}

/// File path → protection. Sorted, so serialization is deterministic.
pub type ProtectionMap = std::collections::BTreeMap<String, Protection>;
