use clap::Parser;
use github_tools::commands::issue_stats::{run, IssueStatsArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = IssueStatsArgs::parse();
    run(&args, &mut std::io::stdout().lock()).await?;
    Ok(())
}
