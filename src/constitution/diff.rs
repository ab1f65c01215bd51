//! Unified diff parsing.
//!
//! Understands `git diff` output: `diff --git` file headers, the extended
//! headers git emits for renames, additions and deletions, `---`/`+++`
//! path lines, and `@@` hunks. Plain unified diffs without the `diff --git`
//! line are accepted too.

/// Errors from parsing diff text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    #[error("line {line}: malformed hunk header: {text}")]
    MalformedHunkHeader { line: usize, text: String },

    #[error("line {line}: hunk ended before its declared length")]
    TruncatedHunk { line: usize },

    #[error("line {line}: unexpected line in hunk: {text}")]
    UnexpectedLine { line: usize, text: String },

    #[error("line {line}: hunk found before any file header")]
    OrphanHunk { line: usize },
}

/// Whether a hunk line is context, an addition, or a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

/// One contiguous block of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub source_start: i64,
    pub source_length: i64,
    pub target_start: i64,
    pub target_length: i64,

    /// Text after the closing `@@`, usually the enclosing function.
    pub section: String,

    pub lines: Vec<(LineKind, String)>,
}

impl Hunk {
    /// Number of added lines.
    pub fn added(&self) -> i64 {
        self.count(LineKind::Added)
    }

    /// Number of removed lines.
    pub fn removed(&self) -> i64 {
        self.count(LineKind::Removed)
    }

    fn count(&self, kind: LineKind) -> i64 {
        let n = self.lines.iter().filter(|(k, _)| *k == kind).count();
        i64::try_from(n).unwrap_or(i64::MAX)
    }
}

/// The changes to a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchedFile {
    /// Pre-edit path as written in the diff, e.g. `a/src/lib.rs` or `/dev/null`.
    pub source_file: String,

    /// Post-edit path as written in the diff, e.g. `b/src/lib.rs` or `/dev/null`.
    pub target_file: String,

    pub is_rename: bool,
    deleted: bool,
    created: bool,
    pub hunks: Vec<Hunk>,
}

const DEV_NULL: &str = "/dev/null";

impl PatchedFile {
    /// Repository-relative path of the file.
    ///
    /// The source path without its `a/` prefix, unless the file is new, in
    /// which case the target path without `b/`.
    pub fn path(&self) -> &str {
        if let Some(source) = self.source_file.strip_prefix("a/")
            && (self.target_file.starts_with("b/") || self.target_file == DEV_NULL)
        {
            return source;
        }
        if self.source_file == DEV_NULL
            && let Some(target) = self.target_file.strip_prefix("b/")
        {
            return target;
        }
        &self.source_file
    }

    /// Pre-edit path without its `a/` prefix.
    pub fn source_path(&self) -> &str {
        self.source_file
            .strip_prefix("a/")
            .unwrap_or(&self.source_file)
    }

    pub fn is_removed_file(&self) -> bool {
        self.deleted || self.target_file == DEV_NULL
    }

    pub fn is_added_file(&self) -> bool {
        self.created || self.source_file == DEV_NULL
    }
}

/// Parse unified diff text into its files.
///
/// Empty input yields no files.
pub fn parse(text: &str) -> Result<Vec<PatchedFile>, DiffError> {
    let mut files: Vec<PatchedFile> = Vec::new();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

    while let Some((number, line)) = lines.next() {
        if let Some(paths) = line.strip_prefix("diff --git ") {
            files.push(from_git_header(paths));
        } else if let Some(path) = line.strip_prefix("--- ") {
            header_file(&mut files).source_file = clean_path(path);
        } else if let Some(path) = line.strip_prefix("+++ ") {
            header_file(&mut files).target_file = clean_path(path);
        } else if let Some(path) = line.strip_prefix("rename from ") {
            let file = header_file(&mut files);
            file.is_rename = true;
            file.source_file = format!("a/{path}");
        } else if let Some(path) = line.strip_prefix("rename to ") {
            let file = header_file(&mut files);
            file.is_rename = true;
            file.target_file = format!("b/{path}");
        } else if line.starts_with("deleted file mode") {
            header_file(&mut files).deleted = true;
        } else if line.starts_with("new file mode") {
            header_file(&mut files).created = true;
        } else if line.starts_with("@@ ") {
            let file = files
                .last_mut()
                .ok_or(DiffError::OrphanHunk { line: number })?;
            let hunk = parse_hunk(number, line, &mut lines)?;
            file.hunks.push(hunk);
        }
        // Anything else (index, mode, similarity, "\ No newline") carries
        // nothing the engine needs.
    }

    Ok(files)
}

/// The file that header lines currently apply to.
///
/// A `---` line after hunks starts a new file, which is how plain unified
/// diffs without `diff --git` lines separate files.
fn header_file(files: &mut Vec<PatchedFile>) -> &mut PatchedFile {
    let needs_new = files.last().is_none_or(|f| !f.hunks.is_empty());
    if needs_new {
        files.push(PatchedFile::default());
    }
    let last = files.len() - 1;
    &mut files[last]
}

/// Builds a file from the `a/<src> b/<dst>` part of a `diff --git` line.
fn from_git_header(paths: &str) -> PatchedFile {
    let (source_file, target_file) = match paths.rsplit_once(" b/") {
        Some((source, target)) => (source.to_string(), format!("b/{target}")),
        None => (paths.to_string(), paths.to_string()),
    };
    PatchedFile {
        source_file,
        target_file,
        ..PatchedFile::default()
    }
}

/// Drops the trailing timestamp some tools append after a tab.
fn clean_path(path: &str) -> String {
    path.split('\t').next().unwrap_or(path).trim_end().to_string()
}

fn parse_hunk<'a, I>(number: usize, header: &str, lines: &mut I) -> Result<Hunk, DiffError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let malformed = || DiffError::MalformedHunkHeader {
        line: number,
        text: header.to_string(),
    };

    let rest = header.strip_prefix("@@ -").ok_or_else(malformed)?;
    let (ranges, section) = rest.split_once(" @@").ok_or_else(malformed)?;
    let (source, target) = ranges.split_once(" +").ok_or_else(malformed)?;
    let (source_start, source_length) = parse_range(source).ok_or_else(malformed)?;
    let (target_start, target_length) = parse_range(target).ok_or_else(malformed)?;

    let mut hunk = Hunk {
        source_start,
        source_length,
        target_start,
        target_length,
        section: section.trim().to_string(),
        lines: Vec::new(),
    };

    let mut source_left = source_length;
    let mut target_left = target_length;
    let mut last = number;

    while source_left > 0 || target_left > 0 {
        let Some((line_number, line)) = lines.next() else {
            return Err(DiffError::TruncatedHunk { line: last });
        };
        last = line_number;

        let (kind, text) = match line.chars().next() {
            // Some tools strip the leading space from blank context lines.
            None => (LineKind::Context, ""),
            Some(' ') => (LineKind::Context, &line[1..]),
            Some('-') => (LineKind::Removed, &line[1..]),
            Some('+') => (LineKind::Added, &line[1..]),
            Some('\\') => continue,
            Some(_) => {
                return Err(DiffError::UnexpectedLine {
                    line: line_number,
                    text: line.to_string(),
                });
            }
        };

        let consumes_source = kind != LineKind::Added;
        let consumes_target = kind != LineKind::Removed;
        if (consumes_source && source_left == 0) || (consumes_target && target_left == 0) {
            return Err(DiffError::UnexpectedLine {
                line: line_number,
                text: line.to_string(),
            });
        }
        if consumes_source {
            source_left -= 1;
        }
        if consumes_target {
            target_left -= 1;
        }
        hunk.lines.push((kind, text.to_string()));
    }

    Ok(hunk)
}

/// Parses `start[,length]`; an omitted length means one line.
fn parse_range(range: &str) -> Option<(i64, i64)> {
    match range.split_once(',') {
        Some((start, length)) => Some((start.parse().ok()?, length.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}
