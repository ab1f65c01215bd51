//! Submit task storage: the durable schedule behind [`Scheduler`].

use jiff::Timestamp;
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use crate::{model::SubmitTask, schedule::Scheduler};

use super::{Result, Storage, StorageError, parse_timestamp, parse_uuid};

type TaskRow = (String, i64, String, Option<String>, bool);

impl Storage {
    /// Loads a single task.
    pub fn load_task(&self, id: Uuid) -> Result<SubmitTask> {
        self.conn
            .query_row(
                "SELECT id, bill_id, run_at, last_run_at, enabled FROM submit_task WHERE id = ?1",
                [id.to_string()],
                task_row,
            )
            .optional()?
            .map(parse_task)
            .transpose()?
            .ok_or(StorageError::TaskNotFound(id))
    }

    fn update_task(&self, id: Uuid, sql: &str, params: impl rusqlite::Params) -> Result<()> {
        let rows = self.conn.execute(sql, params)?;
        if rows == 0 {
            return Err(StorageError::TaskNotFound(id));
        }
        Ok(())
    }
}

impl Scheduler for Storage {
    fn schedule(&self, bill: i64, run_at: Timestamp, enabled: bool) -> Result<SubmitTask> {
        let task = SubmitTask {
            id: Uuid::new_v4(),
            bill,
            run_at,
            last_run_at: None,
            enabled,
        };
        self.conn.execute(
            "INSERT INTO submit_task (id, bill_id, run_at, last_run_at, enabled)
             VALUES (?1, ?2, ?3, NULL, ?4)",
            rusqlite::params![task.id.to_string(), bill, run_at.to_string(), enabled],
        )?;
        Ok(task)
    }

    fn enable(&self, task: Uuid, run_at: Timestamp, last_run_at: Timestamp) -> Result<()> {
        self.update_task(
            task,
            "UPDATE submit_task SET enabled = 1, run_at = ?1, last_run_at = ?2 WHERE id = ?3",
            rusqlite::params![run_at.to_string(), last_run_at.to_string(), task.to_string()],
        )
    }

    fn disable(&self, task: Uuid) -> Result<()> {
        self.update_task(
            task,
            "UPDATE submit_task SET enabled = 0 WHERE id = ?1",
            [task.to_string()],
        )
    }

    fn due(&self, now: Timestamp) -> Result<Vec<SubmitTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, bill_id, run_at, last_run_at, enabled FROM submit_task WHERE enabled = 1",
        )?;
        let rows = stmt
            .query_map([], task_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Compared as timestamps, not strings: stored offsets may differ.
        let mut due = Vec::new();
        for row in rows {
            let task = parse_task(row)?;
            if task.is_due(now) {
                due.push(task);
            }
        }
        due.sort_by(|a, b| a.run_at.cmp(&b.run_at));
        Ok(due)
    }

    fn claim(&self, task: Uuid, now: Timestamp) -> Result<bool> {
        let rows = self.atomically(|| -> Result<_> {
            Ok(self.conn.execute(
                "UPDATE submit_task SET enabled = 0, last_run_at = ?1
                 WHERE id = ?2 AND enabled = 1",
                rusqlite::params![now.to_string(), task.to_string()],
            )?)
        })?;
        Ok(rows == 1)
    }
}

fn task_row(row: &Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn parse_task((id, bill, run_at, last_run_at, enabled): TaskRow) -> Result<SubmitTask> {
    Ok(SubmitTask {
        id: parse_uuid("id", &id)?,
        bill,
        run_at: parse_timestamp("run_at", &run_at)?,
        last_run_at: last_run_at
            .as_deref()
            .map(|s| parse_timestamp("last_run_at", s))
            .transpose()?,
        enabled,
    })
}
