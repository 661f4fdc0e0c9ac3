use clap::Parser;
use std::io::Write;
use std::ops::ControlFlow;

use super::{connect, CommonArgs};
use crate::error::Result;
use crate::filters::IssueState;
use crate::report::{mergeable_label, MergeabilityStats};

/// Print the mergeability of every open pull request and the share of
/// unmergeable ones.
#[derive(Parser, Debug)]
#[command(name = "unmergeable-prs", version)]
pub struct UnmergeablePrsArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// How often to ask for a mergeability the forge has not computed yet
    #[arg(long, value_name = "N")]
    pub max_polls: Option<u32>,
}

pub async fn run(args: &UnmergeablePrsArgs, out: &mut impl Write) -> Result<()> {
    let mut config = args.common.load_config()?;
    if let Some(polls) = args.max_polls {
        config.rate_limiting.max_mergeable_polls = polls;
    }
    let repo = config.repo.repository();
    let client = connect(&config)?;

    let mut open = Vec::new();
    client
        .visit_pulls(&repo, IssueState::Open, |pr| {
            open.push(pr.number);
            ControlFlow::Continue(())
        })
        .await?;

    let mut stats = MergeabilityStats::default();
    for number in open {
        let mergeable = client.fetch_pull_mergeable(&repo, number).await?;
        writeln!(out, "nr {}, mergeable: {}", number, mergeable_label(mergeable))?;
        stats.record(mergeable);
    }
    writeln!(out, "{}", stats)?;
    Ok(())
}
