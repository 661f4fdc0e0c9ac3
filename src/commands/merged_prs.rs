use chrono::{DateTime, Utc};
use clap::Parser;
use log::{debug, info};
use std::io::Write;
use std::ops::ControlFlow;

use super::{connect, threshold_tag, write_lines, CommonArgs};
use crate::client::GitHubClient;
use crate::error::Result;
use crate::filters::{IssueFilters, IssueState};
use crate::report::merged_pull_lines;
use crate::types::{ForgeItem, Repository};

/// Print a markdown list of the pull requests merged since a tag.
#[derive(Parser, Debug)]
#[command(name = "merged-prs-since-tag", version)]
pub struct MergedPrsArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Tag to report from; the most recent tag when omitted
    pub tag: Option<String>,
}

/// Collects merged pull requests from a listing ordered by most recent update.
///
/// Closing a pull request counts as an update, so once an item was last
/// updated at or before the threshold nothing after it can qualify.
#[derive(Debug)]
pub struct MergedSince {
    threshold: DateTime<Utc>,
    filters: IssueFilters,
    merged: Vec<ForgeItem>,
}

impl MergedSince {
    pub fn new(threshold: DateTime<Utc>) -> Self {
        Self {
            threshold,
            filters: IssueFilters::merged_since(threshold),
            merged: Vec::new(),
        }
    }

    pub fn visit(&mut self, pr: ForgeItem) -> ControlFlow<()> {
        if pr.updated_at <= self.threshold {
            debug!("#{} predates the threshold, stopping", pr.number);
            return ControlFlow::Break(());
        }
        if self.filters.matches(&pr) {
            self.merged.push(pr);
        }
        ControlFlow::Continue(())
    }

    pub fn into_merged(self) -> Vec<ForgeItem> {
        self.merged
    }
}

pub async fn merged_pulls_since(
    client: &GitHubClient,
    repo: &Repository,
    threshold: DateTime<Utc>,
) -> Result<Vec<ForgeItem>> {
    let mut collector = MergedSince::new(threshold);
    client
        .visit_pulls(repo, IssueState::Closed, |pr| collector.visit(pr))
        .await?;
    Ok(collector.into_merged())
}

pub async fn run(args: &MergedPrsArgs, out: &mut impl Write) -> Result<()> {
    let config = args.common.load_config()?;
    let repo = config.repo.repository();
    let client = connect(&config)?;
    let tag = threshold_tag(&client, &repo, args.tag.as_deref()).await?;

    let merged = merged_pulls_since(&client, &repo, tag.date).await?;
    if merged.is_empty() {
        info!("No pull requests merged since {}", tag.name);
        return Ok(());
    }
    write_lines(out, &merged_pull_lines(&merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemState;
    use chrono::{Duration, TimeZone};

    fn pull(number: u64, updated_day: i64, merged: bool) -> ForgeItem {
        let at = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap() + Duration::days(updated_day);
        ForgeItem {
            number,
            title: format!("pull {}", number),
            state: ItemState::Closed,
            author: "dimitre".to_string(),
            closed_by: None,
            labels: Vec::new(),
            created_at: at - Duration::days(3),
            updated_at: at,
            closed_at: Some(at),
            merged_at: merged.then_some(at),
            html_url: String::new(),
            is_pull_request: true,
        }
    }

    #[test]
    fn test_stops_at_threshold() {
        let threshold = Utc.with_ymd_and_hms(2021, 1, 5, 0, 0, 0).unwrap();
        let mut collector = MergedSince::new(threshold);

        assert!(collector.visit(pull(9, 8, true)).is_continue());
        assert!(collector.visit(pull(8, 6, false)).is_continue());
        assert!(collector.visit(pull(7, 5, true)).is_continue());
        // Updated exactly at the threshold: nothing further can qualify.
        assert!(collector.visit(pull(6, 4, true)).is_break());

        let numbers: Vec<u64> = collector.into_merged().iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![9, 7]);
    }
}
