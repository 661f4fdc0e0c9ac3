pub mod binning;
pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod filters;
pub mod git;
pub mod plot;
pub mod report;
pub mod tags;
pub mod timeline;
pub mod traffic;
pub mod types;

use std::path::PathBuf;

pub use binning::WeeklyBins;
pub use cache::{IssueCache, MergeOutcome, MergeSummary, SyncPlan};
pub use client::GitHubClient;
pub use config::{Credentials, FetchConfig, GitHubConfig, RateLimitConfig, RepoConfig, StatsConfig};
pub use error::{GitHubToolsError, Result};
pub use filters::{IssueFilters, IssueState};
pub use report::MergeabilityStats;
pub use tags::resolve_tag;
pub use timeline::{DurationSummary, OpenIssueSeries};
pub use traffic::TrafficMeter;
pub use types::{CommitRecord, ForgeItem, IssueRecord, ItemState, Repository, TagRecord};

/// Assembles a [`GitHubClient`] from a configuration plus explicit overrides.
pub struct GitHubClientBuilder {
    config: FetchConfig,
    token: Option<String>,
}

impl GitHubClientBuilder {
    pub fn new() -> Self {
        Self::from_config(FetchConfig::default())
    }

    pub fn from_config(config: FetchConfig) -> Self {
        Self {
            config,
            token: None,
        }
    }

    /// Use this token instead of reading the token file.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.github.token_file = path.into();
        self
    }

    /// Fall back to this environment variable when the token file is absent.
    pub fn token_env_var(mut self, var_name: impl Into<String>) -> Self {
        self.config.github.token_env_var = Some(var_name.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.github.api_base_url = url.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.github.timeout_seconds = seconds;
        self
    }

    pub fn max_mergeable_polls(mut self, polls: u32) -> Self {
        self.config.rate_limiting.max_mergeable_polls = polls;
        self
    }

    pub fn mergeable_poll_interval_ms(mut self, millis: u64) -> Self {
        self.config.rate_limiting.mergeable_poll_interval_ms = millis;
        self
    }

    pub fn build(self) -> Result<GitHubClient> {
        let credentials = match self.token {
            Some(token) => Credentials::new(token),
            None => Credentials::load(&self.config.github)?,
        };
        GitHubClient::with_credentials(&self.config, &credentials)
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
