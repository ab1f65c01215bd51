//! CLI interface for Webiscite.
//!
//! Every subcommand is non-interactive: arguments in, plain text out on
//! stdout, logs on stderr. Commands split into three groups:
//!
//! - `webiscite user|bill|tick`: the bill lifecycle, against the database.
//! - `webiscite webhook`: one GitHub delivery, body on stdin.
//! - `webiscite constitution`: the protection document alone.

mod bill;
mod constitution;
mod format;
mod user;
mod webhook;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jiff::Timestamp;

use crate::{
    config::Config,
    constitution::ProtectionRegistry,
    github::GhCli,
    lifecycle::Lifecycle,
    schedule,
    storage::Storage,
    tally::VotingPolicy,
};

use bill::BillCommand;
use constitution::ConstitutionCommand;
use user::UserCommand;

/// Webiscite: pull requests voted into law.
#[derive(Debug, Parser)]
#[command(name = "webiscite", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: a bill from pull request to merge
  1. webiscite user add alice --github-id 1001
  2. GitHub delivers `pull_request` opened:
     webiscite webhook --event pull_request --signature sha256=... < payload.json
     → bill 1 is open for voting
  3. webiscite bill vote 1 --as alice yes
  4. webiscite tick   (from cron; submits bills whose vote has ended)

Constitution:
  webiscite constitution check pr.diff
  webiscite constitution update pr.diff --write"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register and list voters.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Inspect bills, vote, publish drafts, and close bills.
    Bill {
        #[command(subcommand)]
        command: BillCommand,
    },

    /// Process one GitHub webhook delivery read from stdin.
    ///
    /// Prints the response body. Exits non-zero, printing the HTTP status
    /// a server would answer with, when the delivery is refused or fails.
    Webhook {
        /// Value of the `X-GitHub-Event` header.
        #[arg(long)]
        event: Option<String>,

        /// Value of the `X-Hub-Signature-256` header.
        #[arg(long)]
        signature: Option<String>,
    },

    /// Submit every bill whose voting period has ended.
    ///
    /// Each due task fires once; meant to run periodically.
    Tick,

    /// Check diffs against the protection document and maintain it.
    Constitution {
        /// Protection document to use instead of the configured one.
        #[arg(long, global = true)]
        file: Option<PathBuf>,

        #[command(subcommand)]
        command: ConstitutionCommand,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Constitution { file, command } => {
            let path = match file {
                Some(path) => path,
                None => Config::load()?.constitution_path(),
            };
            constitution::run(&ProtectionRegistry::new(path), &command)
        }
        Command::User { command } => user::run(&Context::load()?.storage, &command),
        Command::Bill { command } => bill::run(&Context::load()?.lifecycle(), &command),
        Command::Webhook { event, signature } => {
            let context = Context::load()?;
            webhook::run(
                &context.lifecycle(),
                &context.config.webhook_secret,
                event.as_deref(),
                signature.as_deref(),
            )
        }
        Command::Tick => cmd_tick(&Context::load()?.lifecycle()),
    }
}

/// Everything the lifecycle commands share, built from the config file.
struct Context {
    config: Config,
    storage: Storage,
    host: GhCli,
    registry: ProtectionRegistry,
    policy: VotingPolicy,
}

impl Context {
    fn load() -> Result<Self, String> {
        let config = Config::load()?;

        let database = config
            .database_path()
            .ok_or("could not determine home directory")?;
        let storage = Storage::open(&database)
            .map_err(|e| format!("failed to open {}: {e}", database.display()))?;

        let identity = config.identity();
        let gh_config =
            Config::gh_config_dir(&identity).ok_or("could not determine home directory")?;
        let host = GhCli::new(config.repo.clone(), config.checkout.clone(), gh_config);

        let registry = ProtectionRegistry::new(config.constitution_path());
        let policy = config.policy.to_policy();

        Ok(Self {
            config,
            storage,
            host,
            registry,
            policy,
        })
    }

    fn lifecycle(&self) -> Lifecycle<'_, GhCli> {
        Lifecycle::new(&self.storage, &self.host, &self.registry, &self.policy)
    }
}

fn cmd_tick(lifecycle: &Lifecycle<'_, GhCli>) -> Result<(), String> {
    let fired = schedule::run_due(lifecycle, Timestamp::now())
        .map_err(|e| format!("failed to run due tasks: {e}"))?;

    if fired.is_empty() {
        println!("Nothing due");
        return Ok(());
    }
    for f in &fired {
        println!("{}", format::format_fired(f));
    }
    Ok(())
}
