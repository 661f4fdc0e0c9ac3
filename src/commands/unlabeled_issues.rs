use clap::Parser;
use log::{info, warn};
use std::io::{BufRead, Write};
use std::ops::ControlFlow;

use super::{connect, CommonArgs};
use crate::error::{GitHubToolsError, Result};
use crate::filters::{IssueFilters, IssueState};
use crate::types::ForgeItem;

/// List open issues that carry no label.
#[derive(Parser, Debug)]
#[command(name = "issues-without-labels", version)]
pub struct UnlabeledIssuesArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Offer to open the listed issues in the browser
    #[arg(long)]
    pub open: bool,
}

pub async fn run(args: &UnlabeledIssuesArgs, out: &mut impl Write) -> Result<()> {
    let config = args.common.load_config()?;
    let repo = config.repo.repository();
    let client = connect(&config)?;

    let filters = IssueFilters::unlabeled_issues();
    let mut unlabeled = Vec::new();
    client
        .visit_issues(&repo, IssueState::Open, None, |item| {
            if filters.matches(&item) {
                unlabeled.push(item);
            }
            ControlFlow::Continue(())
        })
        .await?;

    write_report(out, &unlabeled)?;

    if args.open && !unlabeled.is_empty() && confirm_open(out, &mut std::io::stdin().lock())? {
        open_in_browser(&unlabeled);
    }
    Ok(())
}

fn write_report(out: &mut impl Write, unlabeled: &[ForgeItem]) -> Result<()> {
    writeln!(out, "List of open issues without labels:")?;
    for item in unlabeled {
        writeln!(out, "{}", item.number)?;
    }
    writeln!(out)?;
    for item in unlabeled {
        writeln!(out, "{}", item.html_url)?;
    }
    Ok(())
}

/// Ask before opening anything; only an answer of `y` agrees.
fn confirm_open(out: &mut impl Write, input: &mut impl BufRead) -> Result<bool> {
    writeln!(out, "Press \"y\" to open all issues in the browser, other key to quit:")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn open_in_browser(items: &[ForgeItem]) {
    info!("Opening {} issues", items.len());
    for item in items {
        if let Err(e) = opener::open_browser(&item.html_url) {
            let e = GitHubToolsError::OpenError {
                target: item.html_url.clone(),
                reason: e.to_string(),
            };
            warn!("{}", e);
        }
    }
}
