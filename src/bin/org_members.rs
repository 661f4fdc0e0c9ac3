use clap::Parser;
use github_tools::commands::org_members::{run, OrgMembersArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = OrgMembersArgs::parse();
    run(&args, &mut std::io::stdout().lock()).await?;
    Ok(())
}
