use clap::Parser;
use github_tools::commands::unmergeable_prs::{run, UnmergeablePrsArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = UnmergeablePrsArgs::parse();
    run(&args, &mut std::io::stdout().lock()).await?;
    Ok(())
}
