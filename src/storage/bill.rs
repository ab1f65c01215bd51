//! Bill storage: create, load, update, and list bills.

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::model::{Bill, BillStatus};

use super::{Result, Storage, StorageError, parse_timestamp, parse_uuid};

const COLUMNS: &str =
    "id, name, description, author_id, pull_request, status, constitutional, submit_task, \
     created, modified";

/// The fields of a bill chosen at creation; the rest are assigned by storage.
#[derive(Debug, Clone)]
pub struct NewBill<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub author: i64,
    pub pull_request: i64,
    pub status: BillStatus,
    pub constitutional: bool,
}

/// Raw column values of a bill row, before parsing.
type BillRow = (
    i64,
    String,
    String,
    i64,
    i64,
    String,
    bool,
    Option<String>,
    String,
    String,
);

impl Storage {
    /// Inserts a bill without a submit task.
    ///
    /// Fails with [`StorageError::Constraint`] if the pull request already
    /// has a draft or open bill.
    pub fn insert_bill(&self, bill: &NewBill<'_>, now: Timestamp) -> Result<Bill> {
        self.conn.execute(
            "INSERT INTO bill
                 (name, description, author_id, pull_request, status, constitutional,
                  submit_task, created, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?7)",
            rusqlite::params![
                bill.name,
                bill.description,
                bill.author,
                bill.pull_request,
                bill.status.as_str(),
                bill.constitutional,
                now.to_string(),
            ],
        )?;
        Ok(Bill {
            id: self.conn.last_insert_rowid(),
            name: bill.name.to_string(),
            description: bill.description.to_string(),
            author: bill.author,
            pull_request: bill.pull_request,
            status: bill.status,
            constitutional: bill.constitutional,
            submit_task: None,
            created: now,
            modified: now,
        })
    }

    /// Loads a single bill.
    pub fn load_bill(&self, id: i64) -> Result<Bill> {
        query_bill(&self.conn, "id = ?1", id)?.ok_or(StorageError::BillNotFound(id))
    }

    /// The draft or open bill for a pull request, if there is one.
    pub fn live_bill_for_pull_request(&self, number: i64) -> Result<Option<Bill>> {
        query_bill(
            &self.conn,
            "pull_request = ?1 AND status IN ('draft', 'open')",
            number,
        )
    }

    /// Moves a bill to `status`.
    pub fn set_bill_status(&self, id: i64, status: BillStatus, now: Timestamp) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE bill SET status = ?1, modified = ?2 WHERE id = ?3",
            rusqlite::params![status.as_str(), now.to_string(), id],
        )?;
        if rows == 0 {
            return Err(StorageError::BillNotFound(id));
        }
        Ok(())
    }

    /// Records the submit task that will close a bill's vote.
    pub fn link_submit_task(&self, id: i64, task: Uuid) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE bill SET submit_task = ?1 WHERE id = ?2",
            rusqlite::params![task.to_string(), id],
        )?;
        if rows == 0 {
            return Err(StorageError::BillNotFound(id));
        }
        Ok(())
    }

    /// Lists bills in creation order, optionally only those in `status`.
    ///
    /// Ids increase with creation, so they order bills without comparing
    /// stored timestamp text.
    pub fn list_bills(&self, status: Option<BillStatus>) -> Result<Vec<Bill>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM bill WHERE ?1 IS NULL OR status = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([status.map(BillStatus::as_str)], bill_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(parse_bill).collect()
    }
}

fn query_bill(conn: &Connection, filter: &str, key: i64) -> Result<Option<Bill>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM bill WHERE {filter}"),
        [key],
        bill_row,
    )
    .optional()?
    .map(parse_bill)
    .transpose()
}

fn bill_row(row: &Row<'_>) -> rusqlite::Result<BillRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn parse_bill(row: BillRow) -> Result<Bill> {
    let (
        id,
        name,
        description,
        author,
        pull_request,
        status_str,
        constitutional,
        task_str,
        created_str,
        modified_str,
    ) = row;

    let status = BillStatus::parse(&status_str)
        .ok_or_else(|| StorageError::Corrupt(format!("unknown bill status: {status_str}")))?;
    let submit_task = task_str
        .as_deref()
        .map(|s| parse_uuid("submit_task", s))
        .transpose()?;

    Ok(Bill {
        id,
        name,
        description,
        author,
        pull_request,
        status,
        constitutional,
        submit_task,
        created: parse_timestamp("created", &created_str)?,
        modified: parse_timestamp("modified", &modified_str)?,
    })
}
