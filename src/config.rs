use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GitHubToolsError, Result};
use crate::types::Repository;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub github: GitHubConfig,
    pub repo: RepoConfig,
    pub rate_limiting: RateLimitConfig,
    pub stats: StatsConfig,
}

impl FetchConfig {
    /// Load a JSON config file. Missing sections keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            GitHubToolsError::ConfigError(format!(
                "Cannot read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = serde_json::from_str(&raw)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token_file: PathBuf,
    /// Environment variable consulted when the token file is absent. Unset by
    /// default, so a missing token file is fatal.
    pub token_env_var: Option<String>,
    pub api_base_url: String,
    pub timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from("github_token.txt"),
            token_env_var: None,
            api_base_url: "https://api.github.com".to_string(),
            timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub owner: String,
    pub name: String,
    pub target_branch: String,
    pub organization: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            owner: "openframeworks".to_string(),
            name: "openFrameworks".to_string(),
            target_branch: "master".to_string(),
            organization: "openframeworks".to_string(),
        }
    }
}

impl RepoConfig {
    pub fn repository(&self) -> Repository {
        Repository::new(&self.owner, &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub delay_between_requests_ms: u64,
    pub mergeable_poll_interval_ms: u64,
    pub max_mergeable_polls: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            delay_between_requests_ms: 0,
            mergeable_poll_interval_ms: 2000,
            max_mergeable_polls: 10,
        }
    }
}

impl RateLimitConfig {
    pub fn delay_duration(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }

    pub fn mergeable_poll_interval(&self) -> Duration {
        Duration::from_millis(self.mergeable_poll_interval_ms)
    }
}

/// A named date span drawn as a shaded band on the activity chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpan {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventSpan {
    fn on_days(title: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> Option<Self> {
        let day = |(y, m, d): (i32, u32, u32)| {
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        };
        Some(Self {
            title: title.to_string(),
            start: day(start)?,
            end: day(end)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub cache_path: PathBuf,
    pub output_dir: PathBuf,
    pub location_file: PathBuf,
    pub events: Vec<EventSpan>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        let events = [
            ("OFLab Linz", (2008, 9, 4), (2008, 9, 9)),
            ("DevCon Pittsburgh", (2011, 1, 10), (2011, 1, 14)),
            ("DevCon Detroit", (2012, 2, 20), (2012, 2, 27)),
            ("DevCon Yamaguchi", (2013, 8, 8), (2013, 8, 14)),
        ]
        .into_iter()
        .filter_map(|(title, start, end)| EventSpan::on_days(title, start, end))
        .collect();

        Self {
            cache_path: PathBuf::from("issue_stats_cache/issues.json"),
            output_dir: PathBuf::from("issue_stats_autosave"),
            location_file: PathBuf::from("repo_location.txt"),
            events,
        }
    }
}

/// Personal access token used to authenticate every request.
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from the first line of the token file. When the file does
    /// not exist and `token_env_var` is set, that variable is used instead.
    pub fn load(config: &GitHubConfig) -> Result<Self> {
        match first_line(&config.token_file)? {
            Some(token) if !token.is_empty() => return Ok(Self::new(token)),
            Some(_) => {
                return Err(GitHubToolsError::AuthError(format!(
                    "Token file {} is empty. Please put your GitHub access token on its first line.",
                    config.token_file.display()
                )))
            }
            None => {}
        }

        if let Some(var_name) = &config.token_env_var {
            if let Ok(token) = std::env::var(var_name) {
                if !token.trim().is_empty() {
                    debug!("Using token from {}", var_name);
                    return Ok(Self::new(token.trim()));
                }
            }
        }

        Err(GitHubToolsError::ConfigError(format!(
            "Token file {} not found.\nPlease create it, containing your GitHub access token.",
            config.token_file.display()
        )))
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Path of a local working copy named on the first line of `location_file`.
pub fn local_repo_location(location_file: &Path) -> Result<Option<PathBuf>> {
    Ok(first_line(location_file)?
        .filter(|line| !line.is_empty())
        .map(PathBuf::from))
}

fn first_line(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(
            contents
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_token_is_first_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ghp_secret").unwrap();
        writeln!(file, "ignored").unwrap();

        let config = GitHubConfig {
            token_file: file.path().to_path_buf(),
            ..Default::default()
        };
        let credentials = Credentials::load(&config).unwrap();
        assert_eq!(credentials.token(), "ghp_secret");
        assert!(!format!("{:?}", credentials).contains("ghp_secret"));
    }

    #[test]
    fn test_missing_token_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = GitHubConfig {
            token_file: dir.path().join("github_token.txt"),
            ..Default::default()
        };
        let err = tokio_test::assert_err!(Credentials::load(&config));
        let message = err.to_string();
        assert!(message.contains("not found"));
        assert!(message.contains("Please create it"));
    }

    #[test]
    fn test_env_fallback_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let var_name = "GITHUB_TOOLS_TEST_TOKEN_C";
        std::env::set_var(var_name, "ghp_from_env");

        let without = GitHubConfig {
            token_file: dir.path().join("github_token.txt"),
            ..Default::default()
        };
        tokio_test::assert_err!(Credentials::load(&without));

        let with = GitHubConfig {
            token_env_var: Some(var_name.to_string()),
            ..without
        };
        assert_eq!(Credentials::load(&with).unwrap().token(), "ghp_from_env");
    }

    #[test]
    fn test_location_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("repo_location.txt");
        assert_eq!(local_repo_location(&missing).unwrap(), None);

        fs::write(&missing, "/src/openFrameworks\n").unwrap();
        assert_eq!(
            local_repo_location(&missing).unwrap(),
            Some(PathBuf::from("/src/openFrameworks"))
        );
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"repo": {{"owner": "acme", "name": "widgets"}}}}"#).unwrap();

        let config = FetchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.repo.repository().full_name, "acme/widgets");
        assert_eq!(config.repo.target_branch, "master");
        assert_eq!(config.rate_limiting.max_mergeable_polls, 10);
        assert_eq!(config.stats.events.len(), 4);
    }
}
