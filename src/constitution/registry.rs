//! The protection document on disk.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::{ConstitutionError, LineRange, Protection, ProtectionMap};

/// A protection document at a fixed path.
///
/// Nothing is cached: every [`read`](Self::read) goes back to disk, so a
/// freshly merged amendment takes effect on the next evaluation.
#[derive(Debug, Clone)]
pub struct ProtectionRegistry {
    path: PathBuf,
}

impl ProtectionRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the document.
    pub fn read(&self) -> Result<ProtectionMap, ConstitutionError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConstitutionError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let map: ProtectionMap = serde_json::from_str(&json)?;
        validate(&map)?;
        Ok(map)
    }

    /// Replaces the document with `map`.
    pub fn write(&self, map: &ProtectionMap) -> Result<(), ConstitutionError> {
        validate(map)?;
        fs::write(&self.path, to_json(map)?)?;
        Ok(())
    }
}

/// Pretty-printed JSON with sorted keys and a trailing newline.
pub fn to_json(map: &ProtectionMap) -> Result<String, ConstitutionError> {
    let mut json = serde_json::to_string_pretty(map)?;
    json.push('\n');
    Ok(json)
}

/// Checks every range is well formed and no two ranges in a file overlap.
pub fn validate(map: &ProtectionMap) -> Result<(), ConstitutionError> {
    for (path, protection) in map {
        let Protection::Lines(ranges) = protection else {
            continue;
        };
        let invalid = |range: LineRange, reason| ConstitutionError::InvalidRange {
            path: path.clone(),
            range,
            reason,
        };

        for &range in ranges {
            if range.start < 1 {
                return Err(invalid(range, "lines are numbered from 1"));
            }
            if range.start > range.end {
                return Err(invalid(range, "start is after end"));
            }
        }

        let mut sorted = ranges.clone();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(invalid(pair[1], "overlaps another range"));
            }
        }
    }
    Ok(())
}
