//! Two-panel SVG chart of issue and commit activity.

use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use plotters::prelude::*;
use std::path::Path;

use crate::binning::WeeklyBins;
use crate::config::EventSpan;
use crate::error::{GitHubToolsError, Result};
use crate::timeline::OpenIssueSeries;
use crate::types::TagRecord;

const SIZE: (u32, u32) = (1440, 760);

type Coord = (DateTime<Utc>, i64);

fn plot_err<E: std::fmt::Display>(e: E) -> GitHubToolsError {
    GitHubToolsError::PlotError(e.to_string())
}

pub fn chart_file_name(created_on: NaiveDate) -> String {
    format!("repo_viz_{}.svg", created_on)
}

pub struct ActivityChart<'a> {
    pub created_on: NaiveDate,
    pub branch: &'a str,
    pub bins: &'a WeeklyBins,
    pub open_issues: &'a OpenIssueSeries,
    pub created: &'a [u64],
    pub closed: &'a [u64],
    pub commits: &'a [u64],
    pub tags: &'a [TagRecord],
    pub events: &'a [EventSpan],
}

impl ActivityChart<'_> {
    fn in_range(&self, at: DateTime<Utc>) -> bool {
        at >= self.bins.start() && at <= self.bins.end()
    }

    /// Shaded event spans clamped to the plotted range.
    fn event_bands(&self, top: i64) -> Vec<Rectangle<Coord>> {
        self.events
            .iter()
            .filter(|e| e.end >= self.bins.start() && e.start <= self.bins.end())
            .map(|e| {
                let start = e.start.max(self.bins.start());
                let end = e.end.min(self.bins.end());
                Rectangle::new([(start, 0), (end, top)], YELLOW.mix(0.4).filled())
            })
            .collect()
    }

    fn tag_lines(&self, top: i64) -> Vec<PathElement<Coord>> {
        self.tags
            .iter()
            .filter(|t| self.in_range(t.date))
            .map(|t| PathElement::new(vec![(t.date, 0), (t.date, top)], YELLOW.mix(0.6).stroke_width(1)))
            .collect()
    }

    fn labels(&self, top: i64) -> Vec<Text<'static, Coord, String>> {
        let tag_y = top * 9 / 10;
        let event_y = top * 97 / 100;
        let tags = self
            .tags
            .iter()
            .filter(|t| self.in_range(t.date))
            .map(move |t| Text::new(t.name.clone(), (t.date, tag_y), ("sans-serif", 11).into_font()));
        let events = self
            .events
            .iter()
            .filter(|e| self.in_range(e.start))
            .map(move |e| Text::new(e.title.clone(), (e.start, event_y), ("sans-serif", 11).into_font()));
        tags.chain(events).collect()
    }

    fn bars(&self, base: &[u64], height: &[u64], color: RGBAColor) -> Vec<Rectangle<Coord>> {
        self.bins
            .bins()
            .zip(base.iter().zip(height.iter()))
            .filter(|(_, (_, h))| **h > 0)
            .map(|((lo, hi), (b, h))| {
                Rectangle::new([(lo, *b as i64), (hi, (*b + *h) as i64)], color.filled())
            })
            .collect()
    }

    pub fn render_svg(&self, path: &Path) -> Result<()> {
        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let (upper, lower) = root.split_vertically(SIZE.1 as i32 / 2);
        let x_range = self.bins.start()..self.bins.end();
        let x_format = |d: &DateTime<Utc>| d.format("%Y-%m").to_string();

        let zeros = vec![0u64; self.bins.bin_count()];
        let stacked = self
            .created
            .iter()
            .zip(self.closed.iter())
            .map(|(c, d)| (c + d) as i64)
            .max()
            .unwrap_or(0);
        let issues_top = (stacked.max(self.open_issues.max_count()).max(1) * 11) / 10 + 1;

        let mut issues = ChartBuilder::on(&upper)
            .caption(
                format!("Issue tracker statistics - created {}", self.created_on),
                ("sans-serif", 20),
            )
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range.clone(), 0i64..issues_top)
            .map_err(plot_err)?;
        issues
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(15)
            .x_label_formatter(&x_format)
            .draw()
            .map_err(plot_err)?;

        issues.draw_series(self.event_bands(issues_top)).map_err(plot_err)?;
        issues.draw_series(self.tag_lines(issues_top)).map_err(plot_err)?;
        issues
            .draw_series(self.bars(&zeros, self.created, RED.mix(0.8)))
            .map_err(plot_err)?
            .label("created issues")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], RED.mix(0.8).filled()));
        issues
            .draw_series(self.bars(self.created, self.closed, GREEN.mix(0.8)))
            .map_err(plot_err)?
            .label("closed issues")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], GREEN.mix(0.8).filled()));
        issues
            .draw_series(LineSeries::new(
                self.open_issues.points().iter().map(|p| (p.at, p.open)),
                BLACK.mix(0.8).stroke_width(2),
            ))
            .map_err(plot_err)?
            .label("open issues")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLACK.stroke_width(2)));
        issues.draw_series(self.labels(issues_top)).map_err(plot_err)?;
        issues
            .configure_series_labels()
            .position(SeriesLabelPosition::MiddleLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)?;

        let commits_top = (self.commits.iter().copied().max().unwrap_or(0) as i64).max(1) * 11 / 10 + 1;
        let mut commits = ChartBuilder::on(&lower)
            .caption("Commit statistics", ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, 0i64..commits_top)
            .map_err(plot_err)?;
        commits
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(15)
            .x_label_formatter(&x_format)
            .draw()
            .map_err(plot_err)?;

        commits.draw_series(self.event_bands(commits_top)).map_err(plot_err)?;
        commits.draw_series(self.tag_lines(commits_top)).map_err(plot_err)?;
        commits
            .draw_series(self.bars(&zeros, self.commits, BLUE.mix(0.5)))
            .map_err(plot_err)?
            .label(format!("{} commits authored", self.branch))
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], BLUE.mix(0.5).filled()));
        commits.draw_series(self.labels(commits_top)).map_err(plot_err)?;
        commits
            .configure_series_labels()
            .position(SeriesLabelPosition::MiddleLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)?;

        root.present().map_err(plot_err)?;
        info!("Chart written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_chart_file_name() {
        let day = NaiveDate::from_ymd_opt(2021, 4, 30).unwrap();
        assert_eq!(chart_file_name(day), "repo_viz_2021-04-30.svg");
    }

    #[test]
    fn test_bars_skip_empty_bins() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap();
        let bins = WeeklyBins::new(start, end).unwrap();
        let series = OpenIssueSeries::default();
        let chart = ActivityChart {
            created_on: end.date_naive(),
            branch: "master",
            bins: &bins,
            open_issues: &series,
            created: &[2, 0, 1],
            closed: &[0, 0, 1],
            commits: &[0, 0, 0],
            tags: &[],
            events: &[],
        };
        assert_eq!(chart.bars(&[0, 0, 0], chart.created, RED.mix(0.8)).len(), 2);
        assert_eq!(chart.bars(chart.created, chart.closed, GREEN.mix(0.8)).len(), 1);
    }

    #[test]
    fn test_render_svg() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap();
        let bins = WeeklyBins::new(start, end).unwrap();
        let tags = vec![TagRecord {
            name: "0.11.0".to_string(),
            date: Utc.with_ymd_and_hms(2020, 1, 20, 0, 0, 0).unwrap(),
        }];
        let series = OpenIssueSeries::default();
        let counts = vec![1u64; bins.bin_count()];
        let chart = ActivityChart {
            created_on: end.date_naive(),
            branch: "master",
            bins: &bins,
            open_issues: &series,
            created: &counts,
            closed: &counts,
            commits: &counts,
            tags: &tags,
            events: &[],
        };

        let path = dir.path().join(chart_file_name(end.date_naive()));
        chart.render_svg(&path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("0.11.0"));
    }
}
