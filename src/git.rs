//! Commit history read from a local working copy with the `git` binary.

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::path::PathBuf;
use tokio::process::Command;

use crate::error::{GitHubToolsError, Result};
use crate::types::CommitRecord;

/// `git log` format: full hash, committer date and author date, tab separated.
const LOG_FORMAT: &str = "--pretty=format:%H%x09%cI%x09%aI";

pub struct LocalRepository {
    path: PathBuf,
}

impl LocalRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        debug!("git {} (in {})", args.join(" "), self.path.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .await
            .map_err(|e| GitHubToolsError::GitError(format!("cannot run git: {}", e)))?;

        if !output.status.success() {
            return Err(GitHubToolsError::GitError(format!(
                "git {} failed in {}: {}",
                args.join(" "),
                self.path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn current_branch(&self) -> Result<String> {
        Ok(self
            .git(&["symbolic-ref", "--short", "HEAD"])
            .await?
            .trim()
            .to_string())
    }

    pub async fn head_sha(&self) -> Result<String> {
        Ok(self
            .git(&["rev-parse", "--verify", "HEAD"])
            .await?
            .trim()
            .to_string())
    }

    /// Fail unless `branch` is checked out and its tip is `remote_sha`.
    pub async fn verify_checkout(&self, branch: &str, remote_sha: &str) -> Result<()> {
        let actual = self.current_branch().await?;
        if actual != branch {
            return Err(GitHubToolsError::WrongBranch {
                expected: branch.to_string(),
                actual,
            });
        }

        let head = self.head_sha().await?;
        if head != remote_sha {
            return Err(GitHubToolsError::OutOfSync {
                expected: remote_sha.to_string(),
                actual: head,
            });
        }

        Ok(())
    }

    pub async fn commits(&self, branch: &str) -> Result<Vec<CommitRecord>> {
        let out = self.git(&["--no-pager", "log", branch, LOG_FORMAT]).await?;
        let commits = parse_log(&out)?;
        info!(
            "{} commits on record in {}",
            commits.len(),
            self.path.display()
        );
        Ok(commits)
    }
}

fn parse_date(field: &str, line: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(field)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| GitHubToolsError::GitError(format!("bad date in log line '{}': {}", line, e)))
}

/// Parse the output of `git log` run with [`LOG_FORMAT`].
pub fn parse_log(out: &str) -> Result<Vec<CommitRecord>> {
    out.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.trim().split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(sha), Some(committer), Some(author)) => Ok(CommitRecord {
                    sha: sha.to_string(),
                    committer_date: parse_date(committer, line)?,
                    author_date: parse_date(author, line)?,
                }),
                _ => Err(GitHubToolsError::GitError(format!(
                    "unexpected log line '{}'",
                    line
                ))),
            }
        })
        .collect()
}
