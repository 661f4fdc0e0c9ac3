//! Line-oriented text reports printed by the command-line tools.

use serde::Serialize;
use std::fmt;

use crate::types::{ForgeItem, Team, TeamMember};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn closer(item: &ForgeItem) -> &str {
    item.closed_by.as_deref().unwrap_or("unknown")
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.map(|v| v.chars().count()).max().unwrap_or(0)
}

/// Header plus one line per closed issue or pull request.
pub fn closed_item_lines(items: &[ForgeItem]) -> Vec<String> {
    let number_width = items
        .iter()
        .map(|i| i.number.to_string().len())
        .max()
        .unwrap_or(0)
        .max("nr.".len());
    let closer_width = column_width(items.iter().map(closer)).max("closed_by".len());

    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(format!(
        "{:<nw$} {:<19} {:<5} {:<cw$} title",
        "nr.",
        "close_time",
        "PR?",
        "closed_by",
        nw = number_width,
        cw = closer_width
    ));

    for item in items {
        let closed_at = item
            .closed_at
            .map(|at| at.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        let marker = if item.is_pull_request { "wasPR" } else { "" };
        lines.push(format!(
            "{:<nw$} {:<19} {:<5} {:<cw$} {}",
            item.number,
            closed_at,
            marker,
            closer(item),
            item.title,
            nw = number_width,
            cw = closer_width
        ));
    }
    lines
}

/// Markdown bullet list of merged pull requests, author column aligned.
pub fn merged_pull_lines(items: &[ForgeItem]) -> Vec<String> {
    let width = column_width(items.iter().map(|i| i.author.as_str()));
    items
        .iter()
        .map(|item| {
            format!(
                "* [Nr {}]( {} ) by {:<width$}: {}",
                item.number,
                item.html_url,
                item.author,
                item.title,
                width = width
            )
        })
        .collect()
}

/// `Team:` header, one `@login name` line per member, then a blank line.
pub fn team_lines(team: &Team, members: &[TeamMember]) -> Vec<String> {
    let mut lines = vec![format!("{}:", team.name)];
    lines.extend(members.iter().map(|member| {
        format!(
            "@{} {}",
            member.login,
            member.name.as_deref().unwrap_or_default()
        )
    }));
    lines.push(String::new());
    lines
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeabilityStats {
    pub mergeable: usize,
    pub unmergeable: usize,
    /// Pull requests the forge had not finished computing when polling gave up.
    pub unknown: usize,
}

impl MergeabilityStats {
    pub fn record(&mut self, mergeable: Option<bool>) {
        match mergeable {
            Some(true) => self.mergeable += 1,
            Some(false) => self.unmergeable += 1,
            None => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.mergeable + self.unmergeable + self.unknown
    }

    pub fn percentage_unmergeable(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(100.0 * self.unmergeable as f64 / total as f64),
        }
    }
}

impl fmt::Display for MergeabilityStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Open PRs: {}", self.total())?;
        writeln!(f, "Mergeable: {}", self.mergeable)?;
        writeln!(f, "Unmergeable: {}", self.unmergeable)?;
        if self.unknown > 0 {
            writeln!(f, "Unknown: {}", self.unknown)?;
        }
        match self.percentage_unmergeable() {
            Some(pct) => write!(f, "Percentage unmergeable: {:.2}", pct),
            None => write!(f, "Percentage unmergeable: n/a"),
        }
    }
}

pub fn mergeable_label(mergeable: Option<bool>) -> &'static str {
    match mergeable {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    }
}
