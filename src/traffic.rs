//! Network traffic diagnostics between the phases of a run.

use log::{debug, info};
use std::fs;
use std::path::PathBuf;

const NET_DEV: &str = "/proc/net/dev";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficSample {
    pub received: u64,
    pub sent: u64,
}

/// Parse `/proc/net/dev`, summing byte counters of every interface but loopback.
pub fn parse_net_dev(contents: &str) -> Option<TrafficSample> {
    let mut sample = TrafficSample::default();
    let mut seen = false;

    for line in contents.lines().skip(2) {
        let Some((iface, counters)) = line.split_once(':') else {
            continue;
        };
        if iface.trim() == "lo" {
            continue;
        }
        // A field that fails to parse would shift the transmit columns.
        let Ok(fields) = counters
            .split_whitespace()
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
        else {
            debug!("Skipping malformed counters of {}", iface.trim());
            continue;
        };
        if fields.len() < 9 {
            continue;
        }
        sample.received += fields[0];
        sample.sent += fields[8];
        seen = true;
    }

    seen.then_some(sample)
}

/// Remembers the previous sample so each call reports traffic since the last one.
pub struct TrafficMeter {
    source: PathBuf,
    last: Option<TrafficSample>,
}

impl Default for TrafficMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficMeter {
    pub fn new() -> Self {
        Self::with_source(NET_DEV)
    }

    pub fn with_source(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            last: None,
        }
    }

    fn sample(&self) -> Option<TrafficSample> {
        match fs::read_to_string(&self.source) {
            Ok(contents) => parse_net_dev(&contents),
            Err(e) => {
                debug!("Traffic counters unavailable: {}", e);
                None
            }
        }
    }

    /// Log traffic since the previous call. The first call only sets the baseline.
    pub fn log_traffic(&mut self, phase: &str) -> Option<TrafficSample> {
        let current = self.sample()?;
        let delta = self.last.map(|last| TrafficSample {
            received: current.received.saturating_sub(last.received),
            sent: current.sent.saturating_sub(last.sent),
        });
        self.last = Some(current);

        if let Some(delta) = delta {
            info!(
                "{}: {} kB received, {} kB sent",
                phase,
                delta.received / 1024,
                delta.sent / 1024
            );
        }
        delta
    }
}
