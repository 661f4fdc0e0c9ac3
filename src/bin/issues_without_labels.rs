use clap::Parser;
use github_tools::commands::unlabeled_issues::{run, UnlabeledIssuesArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = UnlabeledIssuesArgs::parse();
    run(&args, &mut std::io::stdout().lock()).await?;
    Ok(())
}
