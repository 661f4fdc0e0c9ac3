use clap::Parser;
use github_tools::commands::closed_issues::{run, ClosedIssuesArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = ClosedIssuesArgs::parse();
    run(&args, &mut std::io::stdout().lock()).await?;
    Ok(())
}
