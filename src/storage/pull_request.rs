//! Pull request storage: the local mirror of GitHub pull requests.

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension};

use crate::model::{PullRequest, PullRequestStatus};

use super::{Result, Storage, StorageError, parse_timestamp};

const COLUMNS: &str = "number, title, additions, deletions, diff_url, author_name, status, sha, \
                       draft, created, modified";

impl Storage {
    /// Creates or refreshes the mirror of pull request `pr.number`.
    ///
    /// An existing row keeps its `created` time; every other field is
    /// overwritten. Returns the stored row.
    pub fn upsert_pull_request(&self, pr: &PullRequest) -> Result<PullRequest> {
        self.conn.execute(
            "INSERT INTO pull_request
                 (number, title, additions, deletions, diff_url, author_name, status, sha,
                  draft, created, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (number) DO UPDATE SET
                 title = excluded.title,
                 additions = excluded.additions,
                 deletions = excluded.deletions,
                 diff_url = excluded.diff_url,
                 author_name = excluded.author_name,
                 status = excluded.status,
                 sha = excluded.sha,
                 draft = excluded.draft,
                 modified = excluded.modified",
            rusqlite::params![
                pr.number,
                &pr.title,
                pr.additions,
                pr.deletions,
                &pr.diff_url,
                &pr.author_name,
                pr.status.as_str(),
                &pr.sha,
                pr.draft,
                pr.created.to_string(),
                pr.modified.to_string(),
            ],
        )?;
        self.load_pull_request(pr.number)
    }

    /// Loads a pull request by number.
    pub fn load_pull_request(&self, number: i64) -> Result<PullRequest> {
        load_pull_request_row(&self.conn, number)?.ok_or(StorageError::PullRequestNotFound(number))
    }

    /// The pull request mirror, if `number` has been seen.
    pub fn find_pull_request(&self, number: i64) -> Result<Option<PullRequest>> {
        load_pull_request_row(&self.conn, number)
    }

    /// Marks a pull request open or closed.
    pub fn set_pull_request_status(
        &self,
        number: i64,
        status: PullRequestStatus,
        now: Timestamp,
    ) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE pull_request SET status = ?1, modified = ?2 WHERE number = ?3",
            rusqlite::params![status.as_str(), now.to_string(), number],
        )?;
        if rows == 0 {
            return Err(StorageError::PullRequestNotFound(number));
        }
        Ok(())
    }

    /// Marks a pull request draft or ready for review.
    pub fn set_pull_request_draft(&self, number: i64, draft: bool, now: Timestamp) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE pull_request SET draft = ?1, modified = ?2 WHERE number = ?3",
            rusqlite::params![draft, now.to_string(), number],
        )?;
        if rows == 0 {
            return Err(StorageError::PullRequestNotFound(number));
        }
        Ok(())
    }
}

fn load_pull_request_row(conn: &Connection, number: i64) -> Result<Option<PullRequest>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM pull_request WHERE number = ?1"),
            [number],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, bool>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, String>(10)?,
                ))
            },
        )
        .optional()?;

    let Some((
        number,
        title,
        additions,
        deletions,
        diff_url,
        author_name,
        status_str,
        sha,
        draft,
        created_str,
        modified_str,
    )) = row
    else {
        return Ok(None);
    };

    let status = PullRequestStatus::parse(&status_str).ok_or_else(|| {
        StorageError::Corrupt(format!("unknown pull request status: {status_str}"))
    })?;

    Ok(Some(PullRequest {
        number,
        title,
        additions,
        deletions,
        diff_url,
        author_name,
        status,
        sha,
        draft,
        created: parse_timestamp("created", &created_str)?,
        modified: parse_timestamp("modified", &modified_str)?,
    }))
}

#[cfg(test)]
pub(crate) fn sample_pull_request(number: i64) -> PullRequest {
    let now = Timestamp::now();
    PullRequest {
        number,
        title: format!("Change #{number}"),
        additions: 3,
        deletions: 1,
        diff_url: format!("https://github.com/owner/repo/pull/{number}.diff"),
        author_name: "alice".into(),
        status: PullRequestStatus::Open,
        sha: format!("{number:040x}"),
        draft: false,
        created: now,
        modified: now,
    }
}
