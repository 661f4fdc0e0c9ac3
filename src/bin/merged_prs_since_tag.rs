use clap::Parser;
use github_tools::commands::merged_prs::{run, MergedPrsArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = MergedPrsArgs::parse();
    run(&args, &mut std::io::stdout().lock()).await?;
    Ok(())
}
