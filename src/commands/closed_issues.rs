use clap::Parser;
use log::{debug, info};
use std::io::Write;
use std::ops::ControlFlow;

use super::{connect, threshold_tag, write_lines, CommonArgs};
use crate::error::Result;
use crate::filters::{IssueFilters, IssueState};
use crate::report::closed_item_lines;

/// Print the issues and pull requests closed since a tag.
#[derive(Parser, Debug)]
#[command(name = "closed-issues-since-tag", version)]
pub struct ClosedIssuesArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Tag to report from; the most recent tag when omitted
    pub tag: Option<String>,
}

pub async fn run(args: &ClosedIssuesArgs, out: &mut impl Write) -> Result<()> {
    let config = args.common.load_config()?;
    let repo = config.repo.repository();
    let client = connect(&config)?;
    let tag = threshold_tag(&client, &repo, args.tag.as_deref()).await?;

    // Anything closed after the tag was also updated after it.
    let filters = IssueFilters::closed_since(tag.date);
    let mut closed = Vec::new();
    client
        .visit_issues(&repo, IssueState::Closed, Some(tag.date), |item| {
            if filters.matches(&item) {
                closed.push(item);
            }
            ControlFlow::Continue(())
        })
        .await?;
    info!("{} items closed since {}", closed.len(), tag.name);

    // The listing leaves out who closed an item.
    for item in closed.iter_mut().filter(|item| item.closed_by.is_none()) {
        debug!("Looking up closer of #{}", item.number);
        item.closed_by = client.fetch_issue(&repo, item.number).await?.closed_by;
    }

    write_lines(out, &closed_item_lines(&closed))
}
