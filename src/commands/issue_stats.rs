//! Issue tracker statistics: brings the local issue cache up to date, builds
//! the open-issue timeline and weekly histograms, and renders them next to the
//! commit history as an SVG chart.

use chrono::{Duration, Utc};
use clap::Parser;
use log::info;
use std::fs;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use super::{connect, CommonArgs};
use crate::binning::WeeklyBins;
use crate::cache::{IssueCache, MergeSummary, SyncPlan};
use crate::client::GitHubClient;
use crate::config::{local_repo_location, FetchConfig};
use crate::error::{GitHubToolsError, Result};
use crate::filters::IssueState;
use crate::git::LocalRepository;
use crate::plot::{chart_file_name, ActivityChart};
use crate::timeline::{DurationSummary, OpenIssueSeries};
use crate::traffic::TrafficMeter;
use crate::types::{CommitRecord, IssueRecord, Repository};

/// Plot issue tracker and commit statistics of a repository.
#[derive(Parser, Debug)]
#[command(name = "plot-issue-stats", version)]
pub struct IssueStatsArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Issue cache file
    #[arg(long, value_name = "FILE")]
    pub cache: Option<PathBuf>,

    /// Directory the chart is written to
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Show the chart in the default viewer once it is written
    #[arg(long)]
    pub open: bool,
}

/// Bring `cache` up to date with the forge. An empty cache pulls the whole
/// issue history, otherwise only what changed since the newest cached update.
pub async fn sync_cache(
    client: &GitHubClient,
    repo: &Repository,
    cache: &mut IssueCache,
) -> Result<MergeSummary> {
    let plan = cache.sync_plan();
    let since = match plan {
        SyncPlan::Full => {
            info!("Fetching the full issue history of {}", repo.full_name);
            None
        }
        SyncPlan::Since(last_update) => {
            info!("Cache last updated at {} UTC", last_update);
            Some(last_update)
        }
    };

    let mut summary = MergeSummary::default();
    client
        .visit_issues(repo, IssueState::All, since, |item| {
            summary.count(cache.apply(plan, IssueRecord::from(&item)));
            ControlFlow::Continue(())
        })
        .await?;
    info!(
        "{} issue(s) added, {} updated, {} unchanged",
        summary.inserted, summary.refreshed, summary.skipped
    );
    Ok(summary)
}

/// Commits of the target branch, from the local checkout named in the
/// location file when there is one, otherwise from the API.
async fn load_commits(
    client: &GitHubClient,
    config: &FetchConfig,
    repo: &Repository,
) -> Result<Vec<CommitRecord>> {
    let branch = &config.repo.target_branch;
    match local_repo_location(&config.stats.location_file)? {
        Some(path) => {
            info!("Getting commit data from {}", path.display());
            let local = LocalRepository::new(path);
            let remote_head = client.fetch_branch_head(repo, branch).await?;
            local.verify_checkout(branch, &remote_head).await?;
            local.commits(branch).await
        }
        None => {
            info!("No local repository specified. Getting commits from GitHub");
            client.fetch_commits(repo, branch).await
        }
    }
}

fn open_chart(path: &Path) -> Result<()> {
    info!("Opening {}", path.display());
    opener::open(path).map_err(|e| GitHubToolsError::OpenError {
        target: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn days(duration: Duration) -> String {
    format!("{:.1} days", duration.num_seconds() as f64 / 86_400.0)
}

fn write_duration_summary(out: &mut impl Write, summary: &DurationSummary) -> Result<()> {
    writeln!(out, "Closed issues: {}", summary.closed)?;
    writeln!(out, "Mean time to close: {}", days(summary.mean))?;
    writeln!(out, "Median time to close: {}", days(summary.median))?;
    writeln!(out, "Longest time to close: {}", days(summary.longest_closed))?;
    if let Some((number, open_for)) = summary.longest_open {
        writeln!(out, "Oldest open issue: #{} ({})", number, days(open_for))?;
    }
    Ok(())
}

pub async fn run(args: &IssueStatsArgs, out: &mut impl Write) -> Result<()> {
    let mut config = args.common.load_config()?;
    if let Some(cache) = &args.cache {
        config.stats.cache_path = cache.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.stats.output_dir = dir.clone();
    }
    let repo = config.repo.repository();
    let client = connect(&config)?;
    let mut traffic = TrafficMeter::new();
    traffic.log_traffic("start");

    let remote_open = client.fetch_open_issue_count(&repo).await?;
    writeln!(out, "GitHub shows {} open issues.", remote_open)?;

    let mut cache = IssueCache::load(&config.stats.cache_path, &repo)?;
    sync_cache(&client, &repo, &mut cache).await?;
    writeln!(out, "{} issues on record", cache.len())?;
    traffic.log_traffic("issues");

    let mut tags = client.fetch_tags(&repo).await?;
    tags.sort_by(|a, b| a.date.cmp(&b.date));
    traffic.log_traffic("tags");

    let commits = load_commits(&client, &config, &repo).await?;
    writeln!(out, "{} commits on record", commits.len())?;
    traffic.log_traffic("commits");

    let now = Utc::now();
    let series = OpenIssueSeries::from_issues(cache.records());
    writeln!(out, "Open issues on record: {}", series.final_count())?;
    if let Some(summary) = DurationSummary::from_issues(cache.records(), now) {
        write_duration_summary(out, &summary)?;
    }

    let created_at: Vec<_> = cache.records().map(|r| r.created_at).collect();
    let closed_at: Vec<_> = cache.records().filter_map(|r| r.closed_at).collect();
    let authored_at: Vec<_> = commits.iter().map(|c| c.author_date).collect();

    let bins = WeeklyBins::spanning(
        created_at
            .iter()
            .chain(closed_at.iter())
            .chain(authored_at.iter())
            .copied(),
        now,
    )?;
    writeln!(out, "Data range: {} days", (bins.end() - bins.start()).num_days())?;

    let created = bins.histogram(created_at.iter().copied());
    let closed = bins.histogram(closed_at.iter().copied());
    let authored = bins.histogram(authored_at.iter().copied());

    fs::create_dir_all(&config.stats.output_dir)?;
    let path = config.stats.output_dir.join(chart_file_name(now.date_naive()));
    let chart = ActivityChart {
        created_on: now.date_naive(),
        branch: &config.repo.target_branch,
        bins: &bins,
        open_issues: &series,
        created: &created,
        closed: &closed,
        commits: &authored,
        tags: &tags,
        events: &config.stats.events,
    };
    chart.render_svg(&path)?;
    writeln!(out, "Chart saved as {}", path.display())?;

    // Only a run that got this far rewrites the cache.
    cache.save(&config.stats.cache_path, &repo)?;
    if args.open {
        open_chart(&path)?;
    }

    info!("{} API requests issued", client.request_count());
    Ok(())
}
