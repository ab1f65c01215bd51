//! Webiscite configuration.
//!
//! Loaded from `~/.webiscite/config.toml`. Only `repo`, `checkout`,
//! `identity` and `webhook-secret` are required; everything else has a
//! default.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::{storage::Storage, tally::VotingPolicy};

/// Webiscite configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// The governed repository, as `owner/name`.
    pub repo: String,

    /// A local clone of `repo`, where the constitution is edited and pushed.
    pub checkout: PathBuf,

    /// The protection document, relative to `checkout`.
    #[serde(default = "default_constitution")]
    pub constitution: PathBuf,

    /// SQLite database. Defaults to `~/.webiscite/webiscite.sqlite`.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// The gh identity that merges, closes and pushes.
    /// Overridden by `WEBISCITE_IDENTITY`.
    pub identity: String,

    /// Shared secret for `X-Hub-Signature-256`.
    pub webhook_secret: String,

    #[serde(default)]
    pub policy: PolicyConfig,
}

/// The `[policy]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PolicyConfig {
    pub minimum_quorum: u32,
    pub normal_majority: f64,
    pub supermajority: f64,
    pub voting_period_days: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let policy = VotingPolicy::default();
        Self {
            minimum_quorum: policy.minimum_quorum,
            normal_majority: policy.normal_majority,
            supermajority: policy.supermajority,
            voting_period_days: 7,
        }
    }
}

impl PolicyConfig {
    pub fn to_policy(&self) -> VotingPolicy {
        VotingPolicy {
            minimum_quorum: self.minimum_quorum,
            normal_majority: self.normal_majority,
            supermajority: self.supermajority,
            voting_period: SignedDuration::from_hours(i64::from(self.voting_period_days) * 24),
        }
    }
}

fn default_constitution() -> PathBuf {
    PathBuf::from("constitution.json")
}

impl Config {
    /// Load config from `~/.webiscite/config.toml`.
    /// Returns an error if the file is missing or invalid.
    pub fn load() -> Result<Self, String> {
        let path = Self::path().ok_or("could not determine home directory")?;

        if !path.exists() {
            return Err(format!(
                "no config file found at {}\n\
                 Create one with at minimum:\n\n\
                 repo = \"owner/name\"\n\
                 checkout = \"/path/to/clone\"\n\
                 identity = \"your-github-username\"\n\
                 webhook-secret = \"...\"",
                path.display()
            ));
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        Self::from_toml(&contents, &path)
    }

    /// Parses and validates config text. `path` is only used in messages.
    pub fn from_toml(contents: &str, path: &Path) -> Result<Self, String> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        config
            .validate()
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        match self.repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {}
            _ => return Err(format!("repo must be owner/name, got {:?}", self.repo)),
        }
        for (key, value) in [
            ("identity", &self.identity),
            ("webhook-secret", &self.webhook_secret),
        ] {
            if value.is_empty() {
                return Err(format!("{key} is empty"));
            }
        }
        if self.constitution.is_absolute() {
            return Err("constitution must be relative to checkout".to_string());
        }
        if self.policy.voting_period_days == 0 {
            return Err("voting-period-days must be at least 1".to_string());
        }
        self.policy.to_policy().validate()
    }

    /// The config file path: `~/.webiscite/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".webiscite").join("config.toml"))
    }

    /// The acting identity: `WEBISCITE_IDENTITY` if set, else `identity`.
    pub fn identity(&self) -> String {
        match env::var("WEBISCITE_IDENTITY") {
            Ok(id) if !id.is_empty() => id,
            _ => self.identity.clone(),
        }
    }

    /// `GH_CONFIG_DIR` for `identity`: `~/.webiscite/gh-config/<identity>`.
    pub fn gh_config_dir(identity: &str) -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".webiscite").join("gh-config").join(identity))
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.clone().or_else(Storage::default_path)
    }

    pub fn constitution_path(&self) -> PathBuf {
        self.checkout.join(&self.constitution)
    }
}
