use clap::Parser;
use log::debug;
use std::io::Write;

use super::{connect, write_lines, CommonArgs};
use crate::error::Result;
use crate::filters::is_listed_team;
use crate::report::team_lines;

/// Print the teams of an organization and their members.
#[derive(Parser, Debug)]
#[command(name = "org-members", version)]
pub struct OrgMembersArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Organization to list; the configured one when omitted
    #[arg(long)]
    pub org: Option<String>,
}

pub async fn run(args: &OrgMembersArgs, out: &mut impl Write) -> Result<()> {
    let config = args.common.load_config()?;
    let organization = args
        .org
        .clone()
        .unwrap_or_else(|| config.repo.organization.clone());
    let client = connect(&config)?;

    for team in client.fetch_teams(&organization).await? {
        if !is_listed_team(&team.name) {
            debug!("Skipping team {}", team.name);
            continue;
        }
        let members = client.fetch_team_members(&organization, &team).await?;
        write_lines(out, &team_lines(&team, &members))?;
    }
    Ok(())
}
