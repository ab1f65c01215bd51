//! The governed repository on GitHub: fetch diffs, merge, close, and push
//! constitution updates.
//!
//! [`GhCli`] drives the real repository through `gh` and `git`. Failed
//! commands are returned as errors and never retried.

use std::{
    io,
    path::{Path, PathBuf},
    process::Command,
};

use crate::model::PullRequest;

/// Errors from the hosting service or the local checkout.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: &'static str,
        source: io::Error,
    },

    #[error("{command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Operations the bill lifecycle needs from the code host.
pub trait PullRequestHost {
    /// The pull request's unified diff.
    fn fetch_diff(&self, pr: &PullRequest) -> Result<String, HostError>;

    /// Squash-merges the pull request, pinned to its recorded head commit.
    fn merge(&self, pr: &PullRequest) -> Result<(), HostError>;

    /// Closes the pull request without merging.
    fn close(&self, pr: &PullRequest) -> Result<(), HostError>;

    /// Brings the local checkout up to date with the default branch.
    fn refresh(&self) -> Result<(), HostError>;

    /// Commits the file at `path` in the checkout and pushes it.
    fn publish_constitution(&self, path: &Path, message: &str) -> Result<(), HostError>;
}

/// [`PullRequestHost`] backed by the `gh` and `git` command-line tools.
#[derive(Debug, Clone)]
pub struct GhCli {
    repo: String,
    checkout: PathBuf,
    gh_config: PathBuf,
}

impl GhCli {
    /// `repo` is `owner/name`; `checkout` is a local clone of it; `gh_config`
    /// is the `GH_CONFIG_DIR` holding the identity to act as.
    pub fn new(repo: impl Into<String>, checkout: impl Into<PathBuf>, gh_config: PathBuf) -> Self {
        Self {
            repo: repo.into(),
            checkout: checkout.into(),
            gh_config,
        }
    }

    /// Run a gh command against the repository and return stdout on success.
    fn run_gh(&self, args: &[&str]) -> Result<String, HostError> {
        let output = Command::new("gh")
            .args(args)
            .args(["--repo", &self.repo])
            .env("GH_CONFIG_DIR", &self.gh_config)
            .output()
            .map_err(|source| HostError::Spawn {
                command: "gh",
                source,
            })?;

        if !output.status.success() {
            return Err(HostError::Failed {
                command: format!("gh {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a git command in the checkout and return stdout on success.
    fn run_git(&self, args: &[&str]) -> Result<String, HostError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.checkout)
            .args(args)
            .output()
            .map_err(|source| HostError::Spawn {
                command: "git",
                source,
            })?;

        if !output.status.success() {
            return Err(HostError::Failed {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl PullRequestHost for GhCli {
    fn fetch_diff(&self, pr: &PullRequest) -> Result<String, HostError> {
        let number = pr.number.to_string();
        self.run_gh(&["pr", "diff", &number])
    }

    fn merge(&self, pr: &PullRequest) -> Result<(), HostError> {
        self.run_gh(&merge_args(&pr.number.to_string(), &pr.sha))?;
        Ok(())
    }

    fn close(&self, pr: &PullRequest) -> Result<(), HostError> {
        let number = pr.number.to_string();
        self.run_gh(&["pr", "close", &number])?;
        Ok(())
    }

    fn refresh(&self) -> Result<(), HostError> {
        self.run_git(&["pull", "--ff-only"])?;
        Ok(())
    }

    fn publish_constitution(&self, path: &Path, message: &str) -> Result<(), HostError> {
        let relative = path.strip_prefix(&self.checkout).unwrap_or(path);
        let relative = relative.to_string_lossy();
        self.run_git(&["add", &relative])?;
        self.run_git(&["commit", "-m", message])?;
        self.run_git(&["push"])?;
        Ok(())
    }
}

/// Arguments for a squash merge that fails if the head moved since the vote.
fn merge_args<'a>(number: &'a str, sha: &'a str) -> [&'a str; 6] {
    ["pr", "merge", number, "--squash", "--match-head-commit", sha]
}

/// A host that records calls instead of talking to GitHub.
#[cfg(test)]
pub(crate) mod fake {
    use std::{
        cell::{Cell, RefCell},
        fs,
    };

    use super::*;

    #[derive(Debug, Default)]
    pub struct FakeHost {
        pub diff: RefCell<String>,
        pub fail: Cell<bool>,
        pub calls: RefCell<Vec<String>>,

        /// A file the next `refresh` pulls into the checkout.
        pub upstream: RefCell<Option<(PathBuf, String)>>,
    }

    impl FakeHost {
        pub fn with_diff(diff: &str) -> Self {
            Self {
                diff: RefCell::new(diff.to_string()),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn record(&self, call: String) -> Result<(), HostError> {
            if self.fail.get() {
                return Err(HostError::Failed {
                    command: call,
                    stderr: "host unavailable".into(),
                });
            }
            self.calls.borrow_mut().push(call);
            Ok(())
        }
    }

    impl PullRequestHost for FakeHost {
        fn fetch_diff(&self, pr: &PullRequest) -> Result<String, HostError> {
            self.record(format!("diff #{}", pr.number))?;
            Ok(self.diff.borrow().clone())
        }

        fn merge(&self, pr: &PullRequest) -> Result<(), HostError> {
            self.record(format!("merge #{} at {}", pr.number, pr.sha))
        }

        fn close(&self, pr: &PullRequest) -> Result<(), HostError> {
            self.record(format!("close #{}", pr.number))
        }

        fn refresh(&self) -> Result<(), HostError> {
            self.record("refresh".into())?;
            if let Some((path, contents)) = self.upstream.borrow_mut().take() {
                fs::write(path, contents).unwrap();
            }
            Ok(())
        }

        fn publish_constitution(&self, _path: &Path, message: &str) -> Result<(), HostError> {
            self.record(format!("publish {message}"))
        }
    }
}
