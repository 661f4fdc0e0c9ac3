use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ForgeItem, ItemState};

/// The `state` query parameter of the issue and pull listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum IssueState {
    Open,
    Closed,
    All,
}

impl IssueState {
    pub fn as_query(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
            IssueState::All => "all",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFilters {
    pub state: IssueState,
    pub include_pull_requests: bool,
    pub only_pull_requests: bool,
    pub unlabeled_only: bool,
    pub merged_only: bool,
    /// Keep only items closed strictly after this instant.
    pub closed_after: Option<DateTime<Utc>>,
}

impl Default for IssueFilters {
    fn default() -> Self {
        Self {
            state: IssueState::All,
            include_pull_requests: true,
            only_pull_requests: false,
            unlabeled_only: false,
            merged_only: false,
            closed_after: None,
        }
    }
}

impl IssueFilters {
    /// Open issues carrying no label at all, pull requests excluded.
    pub fn unlabeled_issues() -> Self {
        Self {
            state: IssueState::Open,
            include_pull_requests: false,
            unlabeled_only: true,
            ..Default::default()
        }
    }

    /// Issues and pull requests closed after `threshold`.
    pub fn closed_since(threshold: DateTime<Utc>) -> Self {
        Self {
            state: IssueState::Closed,
            closed_after: Some(threshold),
            ..Default::default()
        }
    }

    /// Pull requests merged and closed after `threshold`.
    pub fn merged_since(threshold: DateTime<Utc>) -> Self {
        Self {
            state: IssueState::Closed,
            only_pull_requests: true,
            merged_only: true,
            closed_after: Some(threshold),
            ..Default::default()
        }
    }

    pub fn matches(&self, item: &ForgeItem) -> bool {
        match self.state {
            IssueState::Open => {
                if item.state != ItemState::Open {
                    return false;
                }
            }
            IssueState::Closed => {
                if item.state != ItemState::Closed {
                    return false;
                }
            }
            IssueState::All => {}
        }

        if !self.include_pull_requests && item.is_pull_request {
            return false;
        }

        if self.only_pull_requests && !item.is_pull_request {
            return false;
        }

        if self.unlabeled_only && !item.labels.is_empty() {
            return false;
        }

        if self.merged_only && !item.is_merged() {
            return false;
        }

        if let Some(threshold) = self.closed_after {
            match item.closed_at {
                Some(closed_at) if closed_at > threshold => {}
                _ => return false,
            }
        }

        true
    }
}

/// Teams whose name mentions `devs` are left out of the member listing.
pub fn is_listed_team(team_name: &str) -> bool {
    !team_name.contains("devs")
}
