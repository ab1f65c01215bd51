//! Local persistence for users, pull requests, bills, votes, and submit tasks.
//!
//! Everything lives in one `SQLite` database, created on first open:
//!
//! ```text
//! ~/.webiscite/webiscite.sqlite
//!   users         # Registered voters, keyed by GitHub account id
//!   pull_request  # Mirror of GitHub pull requests, keyed by number
//!   bill          # One row per bill; at most one draft/open bill per PR
//!   vote          # One row per (bill, user)
//!   submit_task   # When each bill's vote closes
//! ```

mod bill;
mod pull_request;
mod task;
mod user;
mod vote;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use uuid::Uuid;

pub use bill::NewBill;
pub use vote::Tally;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("bill not found: {0}")]
    BillNotFound(i64),

    #[error("pull request not found: #{0}")]
    PullRequestNotFound(i64),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("submit task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(err, message)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(message.unwrap_or_else(|| err.to_string()))
            }
            other => Self::Sqlite(other),
        }
    }
}

pub type Result<T> = core::result::Result<T, StorageError>;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    github_id   TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS pull_request (
    number      INTEGER PRIMARY KEY,
    title       TEXT NOT NULL,
    additions   INTEGER NOT NULL,
    deletions   INTEGER NOT NULL,
    diff_url    TEXT NOT NULL,
    author_name TEXT NOT NULL,
    status      TEXT NOT NULL,
    sha         TEXT NOT NULL UNIQUE,
    draft       INTEGER NOT NULL,
    created     TEXT NOT NULL,
    modified    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bill (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name           TEXT NOT NULL,
    description    TEXT NOT NULL,
    author_id      INTEGER NOT NULL REFERENCES users (id),
    pull_request   INTEGER NOT NULL REFERENCES pull_request (number),
    status         TEXT NOT NULL,
    constitutional INTEGER NOT NULL,
    submit_task    TEXT UNIQUE,
    created        TEXT NOT NULL,
    modified       TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS unique_open_pull_request
    ON bill (pull_request) WHERE status IN ('draft', 'open');

CREATE TABLE IF NOT EXISTS vote (
    bill_id  INTEGER NOT NULL REFERENCES bill (id),
    user_id  INTEGER NOT NULL REFERENCES users (id),
    support  INTEGER NOT NULL,
    cast_at  TEXT NOT NULL,
    PRIMARY KEY (bill_id, user_id)
);

CREATE TABLE IF NOT EXISTS submit_task (
    id          TEXT PRIMARY KEY,
    bill_id     INTEGER NOT NULL REFERENCES bill (id),
    run_at      TEXT NOT NULL,
    last_run_at TEXT,
    enabled     INTEGER NOT NULL
);
";

/// `SQLite`-backed storage for the whole engine.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the database at `path`.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// A private database that vanishes when dropped.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Returns the default database path: `~/.webiscite/webiscite.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".webiscite").join("webiscite.sqlite"))
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Runs `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so two processes running the same
    /// read-then-write sequence serialize instead of both reading stale
    /// state. Commits if `f` succeeds; rolls back otherwise. Must not nest.
    pub fn atomically<T, E>(
        &self,
        f: impl FnOnce() -> core::result::Result<T, E>,
    ) -> core::result::Result<T, E>
    where
        E: From<StorageError>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;
        let value = f()?;
        tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }
}

/// Parses a stored RFC 3339 timestamp.
fn parse_timestamp(column: &str, value: &str) -> Result<Timestamp> {
    value
        .parse::<Timestamp>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

/// Parses a stored task id.
fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    value
        .parse::<Uuid>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}
