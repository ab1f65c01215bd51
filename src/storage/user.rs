//! User storage: the registry of voters.

use rusqlite::{OptionalExtension, Row};

use crate::model::User;

use super::{Result, Storage, StorageError};

impl Storage {
    /// Registers a voter. Usernames and GitHub ids are unique.
    pub fn create_user(&self, username: &str, github_id: &str) -> Result<User> {
        self.conn.execute(
            "INSERT INTO users (username, github_id) VALUES (?1, ?2)",
            rusqlite::params![username, github_id],
        )?;
        Ok(User {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            github_id: github_id.to_string(),
        })
    }

    /// Loads a user by id.
    pub fn load_user(&self, id: i64) -> Result<User> {
        self.conn
            .query_row(
                "SELECT id, username, github_id FROM users WHERE id = ?1",
                [id],
                user_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::UserNotFound(id.to_string()))
    }

    /// Loads a user by username.
    pub fn find_user(&self, username: &str) -> Result<User> {
        self.conn
            .query_row(
                "SELECT id, username, github_id FROM users WHERE username = ?1",
                [username],
                user_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::UserNotFound(username.to_string()))
    }

    /// The user linked to a GitHub account, if any.
    pub fn find_user_by_github_id(&self, github_id: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, username, github_id FROM users WHERE github_id = ?1",
                [github_id],
                user_row,
            )
            .optional()?)
    }

    /// Lists all users in registration order.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, github_id FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], user_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        github_id: row.get(2)?,
    })
}
