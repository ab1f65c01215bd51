//! Voter registration: add, list.

use clap::Subcommand;

use crate::storage::{Storage, StorageError};

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Register a voter. Prints the user ID.
    Add {
        /// Local username, used with `--as` when voting.
        username: String,

        /// The user's numeric GitHub account ID.
        /// Pull requests opened by this account become bills.
        #[arg(long)]
        github_id: String,
    },

    /// List registered voters.
    List,
}

pub(super) fn run(storage: &Storage, command: &UserCommand) -> Result<(), String> {
    match command {
        UserCommand::Add {
            username,
            github_id,
        } => cmd_add(storage, username, github_id),
        UserCommand::List => cmd_list(storage),
    }
}

fn cmd_add(storage: &Storage, username: &str, github_id: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username must not be empty".to_string());
    }
    if github_id.is_empty() || !github_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("github id must be numeric, got {github_id:?}"));
    }

    let user = storage.create_user(username, github_id).map_err(|e| match e {
        StorageError::Constraint(_) => {
            format!("a user named {username} or with github id {github_id} already exists")
        }
        e => format!("failed to add user: {e}"),
    })?;

    println!("{}", user.id);
    Ok(())
}

fn cmd_list(storage: &Storage) -> Result<(), String> {
    let users = storage
        .list_users()
        .map_err(|e| format!("failed to list users: {e}"))?;

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    for u in &users {
        println!("{:>4}  {}  (github {})", u.id, u.username, u.github_id);
    }
    Ok(())
}
