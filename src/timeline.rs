//! Open issue count over time, derived by sweeping +1/-1 status changes.

use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::Serialize;

use crate::types::IssueRecord;

/// An issue being opened (+1) or closed (-1) at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub at: DateTime<Utc>,
    pub delta: i64,
    pub number: u64,
}

/// The running open count right after a status change was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpenCountPoint {
    pub at: DateTime<Utc>,
    pub delta: i64,
    pub open: i64,
}

/// One +1 per issue at creation and one -1 per closed issue at closure, in
/// the order the records are visited.
pub fn status_changes<'a, I>(records: I) -> Vec<StatusChange>
where
    I: IntoIterator<Item = &'a IssueRecord>,
{
    let mut changes = Vec::new();
    for record in records {
        changes.push(StatusChange {
            at: record.created_at,
            delta: 1,
            number: record.number,
        });
        if let Some(closed_at) = record.closed_at {
            changes.push(StatusChange {
                at: closed_at,
                delta: -1,
                number: record.number,
            });
        }
    }
    changes
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OpenIssueSeries {
    points: Vec<OpenCountPoint>,
    /// Issues whose closure predates their creation.
    anomalies: Vec<u64>,
}

impl OpenIssueSeries {
    pub fn from_issues<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a IssueRecord>,
    {
        let records: Vec<&IssueRecord> = records.into_iter().collect();
        let anomalies: Vec<u64> = records
            .iter()
            .filter(|r| r.closed_at.map_or(false, |closed| closed < r.created_at))
            .map(|r| r.number)
            .collect();
        if !anomalies.is_empty() {
            warn!(
                "{} issue(s) closed before they were created: {:?}",
                anomalies.len(),
                anomalies
            );
        }

        let mut series = Self::from_changes(status_changes(records));
        series.anomalies = anomalies;
        series
    }

    /// Stable sort by timestamp, then accumulate. Changes sharing a timestamp
    /// keep their relative order.
    pub fn from_changes(mut changes: Vec<StatusChange>) -> Self {
        changes.sort_by_key(|change| change.at);

        let mut open = 0;
        let points = changes
            .into_iter()
            .map(|change| {
                open += change.delta;
                OpenCountPoint {
                    at: change.at,
                    delta: change.delta,
                    open,
                }
            })
            .collect();

        Self {
            points,
            anomalies: Vec::new(),
        }
    }

    pub fn points(&self) -> &[OpenCountPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn anomalies(&self) -> &[u64] {
        &self.anomalies
    }

    /// Open count after the latest change, i.e. issues that were never closed.
    pub fn final_count(&self) -> i64 {
        self.points.last().map_or(0, |p| p.open)
    }

    pub fn min_count(&self) -> i64 {
        self.points.iter().map(|p| p.open).min().unwrap_or(0)
    }

    pub fn max_count(&self) -> i64 {
        self.points.iter().map(|p| p.open).max().unwrap_or(0)
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.at)
    }
}

/// Time-to-close figures over the cached issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationSummary {
    pub closed: usize,
    pub mean: Duration,
    pub median: Duration,
    pub longest_closed: Duration,
    /// Number and age of the oldest issue still open.
    pub longest_open: Option<(u64, Duration)>,
}

impl DurationSummary {
    pub fn from_issues<'a, I>(records: I, now: DateTime<Utc>) -> Option<Self>
    where
        I: IntoIterator<Item = &'a IssueRecord>,
    {
        let mut closed = Vec::new();
        let mut longest_open: Option<(u64, Duration)> = None;

        for record in records {
            let duration = record.open_duration(now);
            if record.closed_at.is_some() {
                closed.push(duration);
            } else if longest_open.map_or(true, |(_, longest)| duration > longest) {
                longest_open = Some((record.number, duration));
            }
        }

        if closed.is_empty() {
            return None;
        }

        closed.sort();
        let total_seconds: i64 = closed.iter().map(|d| d.num_seconds()).sum();
        let mean = Duration::seconds(total_seconds / closed.len() as i64);
        let median = closed[closed.len() / 2];
        let longest_closed = closed[closed.len() - 1];

        Some(Self {
            closed: closed.len(),
            mean,
            median,
            longest_closed,
            longest_open,
        })
    }
}
