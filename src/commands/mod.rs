//! Argument parsing and run functions behind the binaries in `src/bin/`.
//!
//! Every `run` writes its report to the given writer and logs progress through
//! `log`, so the report stays clean when stdout is redirected.

pub mod closed_issues;
pub mod issue_stats;
pub mod merged_prs;
pub mod org_members;
pub mod unlabeled_issues;
pub mod unmergeable_prs;

use clap::Args;
use log::{debug, info};
use std::io::Write;
use std::path::PathBuf;

use crate::client::GitHubClient;
use crate::config::FetchConfig;
use crate::error::Result;
use crate::tags::resolve_tag;
use crate::types::{Repository, TagRecord};
use crate::GitHubClientBuilder;

/// Flags shared by every tool.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON configuration file; keys it leaves out keep their defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Repository to query, as owner/name
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// File holding the GitHub access token on its first line
    #[arg(long, value_name = "FILE")]
    pub token_file: Option<PathBuf>,
}

impl CommonArgs {
    /// Defaults, then the config file, then command line flags.
    pub fn load_config(&self) -> Result<FetchConfig> {
        let mut config = match &self.config {
            Some(path) => FetchConfig::from_file(path)?,
            None => FetchConfig::default(),
        };

        if let Some(full_name) = &self.repo {
            let repo = Repository::from_full_name(full_name)?;
            config.repo.owner = repo.owner;
            config.repo.name = repo.name;
        }
        if let Some(token_file) = &self.token_file {
            config.github.token_file = token_file.clone();
        }

        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }
}

pub fn connect(config: &FetchConfig) -> Result<GitHubClient> {
    GitHubClientBuilder::from_config(config.clone()).build()
}

/// Fetch the repository's tags and pick the one named `name`, or the newest.
pub async fn threshold_tag(
    client: &GitHubClient,
    repo: &Repository,
    name: Option<&str>,
) -> Result<TagRecord> {
    let tags = client.fetch_tags(repo).await?;
    let tag = resolve_tag(&tags, name)?.clone();
    info!("Using tag {} from {}", tag.name, tag.date);
    Ok(tag)
}

fn write_lines(out: &mut impl Write, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from(["tool", "--repo", "acme/widgets", "--token-file", "/tmp/token"]);
        let config = cli.common.load_config().unwrap();
        assert_eq!(config.repo.repository().full_name, "acme/widgets");
        assert_eq!(config.github.token_file, PathBuf::from("/tmp/token"));
        assert_eq!(config.repo.target_branch, "master");
    }

    #[test]
    fn test_bad_repo_flag() {
        let cli = Cli::parse_from(["tool", "--repo", "widgets"]);
        assert!(cli.common.load_config().is_err());
    }

    #[test]
    fn test_write_lines() {
        let mut out = Vec::new();
        write_lines(&mut out, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\n");
    }
}
