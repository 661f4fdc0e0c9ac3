use chrono::{DateTime, Datelike, Duration, Utc};

use crate::error::{GitHubToolsError, Result};

/// Histogram bucket boundaries spaced one week apart.
///
/// The first edge is `start`, the last is `end`, and every interior edge falls
/// on a Monday at `start`'s time of day. Less than a week of data collapses to
/// the single bucket `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyBins {
    edges: Vec<DateTime<Utc>>,
}

impl WeeklyBins {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(GitHubToolsError::InvalidRange(format!(
                "bin end {} is not after start {}",
                end, start
            )));
        }

        let mut edges = vec![start];
        let days_to_monday = match start.weekday().num_days_from_monday() {
            0 => 7,
            n => 7 - n as i64,
        };
        let mut edge = start + Duration::days(days_to_monday);
        while edge < end {
            edges.push(edge);
            edge += Duration::weeks(1);
        }
        edges.push(end);

        Ok(Self { edges })
    }

    /// Bins covering every timestamp in `data` up to `end`.
    pub fn spanning<I>(data: I, end: DateTime<Utc>) -> Result<Self>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut start: Option<DateTime<Utc>> = None;
        let mut latest = end;
        for at in data {
            start = Some(start.map_or(at, |s| s.min(at)));
            latest = latest.max(at);
        }
        let start = start.ok_or_else(|| {
            GitHubToolsError::InvalidRange("no timestamps to bin".to_string())
        })?;
        Self::new(start, latest)
    }

    pub fn edges(&self) -> &[DateTime<Utc>] {
        &self.edges
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.edges[0]
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.edges[self.edges.len() - 1]
    }

    pub fn bin_count(&self) -> usize {
        self.edges.len() - 1
    }

    /// `(lower, upper)` edge pairs, one per bin.
    pub fn bins(&self) -> impl Iterator<Item = (DateTime<Utc>, DateTime<Utc>)> + '_ {
        self.edges.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Count timestamps per bin. Bins are half-open except the last one, which
    /// also holds `end`. Timestamps outside the edges are dropped.
    pub fn histogram<I>(&self, data: I) -> Vec<u64>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut counts = vec![0u64; self.bin_count()];
        for at in data {
            if at < self.start() || at > self.end() {
                continue;
            }
            let upper = self.edges.partition_point(|edge| *edge <= at);
            let bin = upper.saturating_sub(1).min(counts.len() - 1);
            counts[bin] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    #[test]
    fn test_interior_edges_are_mondays() {
        // 2020-01-01 was a Wednesday.
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 9, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 1, 31, 0, 0, 0).unwrap();
        let bins = WeeklyBins::new(start, end).unwrap();

        let edges = bins.edges();
        assert_eq!(edges.first(), Some(&start));
        assert_eq!(edges.last(), Some(&end));
        assert_eq!(edges.len(), 6);
        for edge in &edges[1..edges.len() - 1] {
            assert_eq!(edge.weekday(), Weekday::Mon);
            assert_eq!(edge.time(), start.time());
        }
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_start_on_monday_skips_to_next_week() {
        let start = Utc.with_ymd_and_hms(2020, 1, 6, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 1, 20, 0, 0, 0).unwrap();
        let bins = WeeklyBins::new(start, end).unwrap();
        assert_eq!(
            bins.edges(),
            &[start, Utc.with_ymd_and_hms(2020, 1, 13, 0, 0, 0).unwrap(), end]
        );
    }

    #[test]
    fn test_short_range_collapses() {
        let start = Utc.with_ymd_and_hms(2020, 1, 7, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 1, 10, 0, 0, 0).unwrap();
        let bins = WeeklyBins::new(start, end).unwrap();
        assert_eq!(bins.edges(), &[start, end]);
        assert_eq!(bins.bin_count(), 1);
    }

    #[test]
    fn test_empty_range_is_rejected() {
        let start = Utc.with_ymd_and_hms(2020, 1, 7, 0, 0, 0).unwrap();
        assert!(WeeklyBins::new(start, start).is_err());
    }

    #[test]
    fn test_histogram_counts() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap();
        let bins = WeeklyBins::new(start, end).unwrap();
        // Edges: Jan 1, Jan 6, Jan 13, Jan 15.
        let data = vec![
            start,
            Utc.with_ymd_and_hms(2020, 1, 5, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 6, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 14, 0, 0, 0).unwrap(),
            end,
            Utc.with_ymd_and_hms(2019, 12, 31, 0, 0, 0).unwrap(),
        ];
        assert_eq!(bins.histogram(data), vec![2, 1, 2]);
    }

    #[test]
    fn test_spanning_covers_data() {
        let now = Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap();
        let data = vec![
            Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 3, 2, 0, 0, 0).unwrap(),
        ];
        let bins = WeeklyBins::spanning(data.clone(), now).unwrap();
        assert!(data.iter().all(|d| *d >= bins.start() && *d <= bins.end()));
        assert_eq!(bins.histogram(data).iter().sum::<u64>(), 3);

        assert!(WeeklyBins::spanning(Vec::new(), now).is_err());
    }
}
