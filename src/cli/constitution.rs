//! Constitution commands: check, update, validate.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::Subcommand;

use crate::constitution::{self, Protection, ProtectionRegistry};

#[derive(Debug, Subcommand)]
pub enum ConstitutionCommand {
    /// List the protected files a diff touches.
    ///
    /// Prints one path per line; nothing when the diff is not an
    /// amendment.
    Check {
        /// Unified diff to check.
        diff: PathBuf,
    },

    /// Shift protected ranges to follow a non-constitutional diff.
    ///
    /// Prints the updated document, or nothing if no range moved.
    Update {
        /// Unified diff that was merged.
        diff: PathBuf,

        /// Write the result back instead of printing it.
        #[arg(long)]
        write: bool,
    },

    /// Check the document parses and its ranges are well formed.
    Validate,
}

pub(super) fn run(
    registry: &ProtectionRegistry,
    command: &ConstitutionCommand,
) -> Result<(), String> {
    match command {
        ConstitutionCommand::Check { diff } => cmd_check(registry, &read_diff(diff)?),
        ConstitutionCommand::Update { diff, write } => {
            cmd_update(registry, &read_diff(diff)?, *write)
        }
        ConstitutionCommand::Validate => cmd_validate(registry),
    }
}

fn read_diff(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
}

fn cmd_check(registry: &ProtectionRegistry, diff: &str) -> Result<(), String> {
    let protection = registry.read().map_err(|e| e.to_string())?;
    let touched =
        constitution::is_constitutional(diff, &protection).map_err(|e| e.to_string())?;

    for path in &touched {
        println!("{path}");
    }
    Ok(())
}

fn cmd_update(registry: &ProtectionRegistry, diff: &str, write: bool) -> Result<(), String> {
    let protection = registry.read().map_err(|e| e.to_string())?;
    let Some(updated) =
        constitution::update_constitution(diff, &protection).map_err(|e| e.to_string())?
    else {
        return Ok(());
    };

    if write {
        registry.write(&updated).map_err(|e| e.to_string())?;
        eprintln!("updated {}", registry.path().display());
    } else {
        print!("{}", constitution::to_json(&updated).map_err(|e| e.to_string())?);
    }
    Ok(())
}

fn cmd_validate(registry: &ProtectionRegistry) -> Result<(), String> {
    let protection = registry.read().map_err(|e| e.to_string())?;

    let whole = protection
        .values()
        .filter(|p| matches!(p, Protection::WholeFile))
        .count();
    println!(
        "{}: {} protected files ({whole} whole, {} by line)",
        registry.path().display(),
        protection.len(),
        protection.len() - whole
    );
    Ok(())
}
