//! Vote storage: one row per (bill, user).

use jiff::Timestamp;
use rusqlite::OptionalExtension;

use crate::model::Vote;

use super::{Result, Storage, StorageError, parse_timestamp};

/// Vote counts for one bill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: u32,
    pub yes: u32,
}

impl Tally {
    pub fn no(self) -> u32 {
        self.total - self.yes
    }
}

impl Storage {
    /// The user's current vote on a bill, if any.
    pub fn load_vote(&self, bill: i64, user: i64) -> Result<Option<Vote>> {
        let row = self
            .conn
            .query_row(
                "SELECT support, cast_at FROM vote WHERE bill_id = ?1 AND user_id = ?2",
                [bill, user],
                |row| Ok((row.get::<_, bool>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        row.map(|(support, cast_at)| {
            Ok(Vote {
                bill,
                user,
                support,
                cast_at: parse_timestamp("cast_at", &cast_at)?,
            })
        })
        .transpose()
    }

    /// Records a new vote. A second vote by the same user is a
    /// [`StorageError::Constraint`].
    pub fn insert_vote(&self, vote: &Vote) -> Result<()> {
        self.conn.execute(
            "INSERT INTO vote (bill_id, user_id, support, cast_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![vote.bill, vote.user, vote.support, vote.cast_at.to_string()],
        )?;
        Ok(())
    }

    /// Flips an existing vote and refreshes its time.
    pub fn update_vote(&self, vote: &Vote) -> Result<()> {
        self.conn.execute(
            "UPDATE vote SET support = ?1, cast_at = ?2 WHERE bill_id = ?3 AND user_id = ?4",
            rusqlite::params![vote.support, vote.cast_at.to_string(), vote.bill, vote.user],
        )?;
        Ok(())
    }

    /// Retracts a vote. Does nothing if the user had not voted.
    pub fn delete_vote(&self, bill: i64, user: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM vote WHERE bill_id = ?1 AND user_id = ?2",
            [bill, user],
        )?;
        Ok(())
    }

    /// Counts total and yes votes on a bill.
    pub fn tally(&self, bill: i64) -> Result<Tally> {
        let (total, yes) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(support), 0) FROM vote WHERE bill_id = ?1",
            [bill],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        let count = |n: i64| {
            u32::try_from(n).map_err(|e| StorageError::Corrupt(format!("vote count {n}: {e}")))
        };
        Ok(Tally {
            total: count(total)?,
            yes: count(yes)?,
        })
    }
}
