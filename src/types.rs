use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GitHubToolsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
}

/// An issue or pull request as returned by the issue and pull listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeItem {
    pub number: u64,
    pub title: String,
    pub state: ItemState,
    /// Login of the user who opened the item.
    pub author: String,
    /// Login of the user who closed the item, when the forge reported it.
    pub closed_by: Option<String>,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub html_url: String,
    pub is_pull_request: bool,
}

impl ForgeItem {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

/// The part of an issue kept in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    pub title: String,
    pub state: ItemState,
    pub is_pull_request: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl IssueRecord {
    /// Time from creation until closure, or until `now` while still open.
    pub fn open_duration(&self, now: DateTime<Utc>) -> Duration {
        self.closed_at.unwrap_or(now) - self.created_at
    }
}

impl From<&ForgeItem> for IssueRecord {
    fn from(item: &ForgeItem) -> Self {
        Self {
            number: item.number,
            title: item.title.clone(),
            state: item.state,
            is_pull_request: item.is_pull_request,
            created_at: item.created_at,
            updated_at: item.updated_at,
            closed_at: item.closed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    /// Committer date of the tagged commit.
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub author_date: DateTime<Utc>,
    pub committer_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub login: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub full_name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        let full_name = format!("{}/{}", owner, name);
        Self {
            owner,
            name,
            full_name,
        }
    }

    pub fn from_full_name(full_name: &str) -> Result<Self> {
        match full_name.split('/').collect::<Vec<_>>()[..] {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self::new(owner, name)),
            _ => Err(GitHubToolsError::InvalidRepository(format!(
                "Expected 'owner/name', got: {}",
                full_name
            ))),
        }
    }
}
