/// Chart-oriented views over the rolling windows

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::models::Sample;
use crate::core::window::{distinct_instances, RollingWindow};

/// Host selector for the metric charts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HostFilter {
    #[default]
    All,
    Host(String),
}

impl HostFilter {
    pub fn from_option(host: Option<String>) -> Self {
        match host {
            Some(h) if !h.is_empty() && h != "all" => HostFilter::Host(h),
            _ => HostFilter::All,
        }
    }

    pub fn matches(&self, sample: &Sample) -> bool {
        match self {
            HostFilter::All => true,
            HostFilter::Host(host) => &sample.instance == host,
        }
    }

    /// All -> each host in order -> All
    pub fn next(&self, hosts: &[String]) -> Self {
        let next = match self {
            HostFilter::All => hosts.first(),
            HostFilter::Host(current) => hosts
                .iter()
                .position(|h| h == current)
                .and_then(|pos| hosts.get(pos + 1)),
        };
        next.map_or(HostFilter::All, |h| HostFilter::Host(h.clone()))
    }

    pub fn label(&self) -> &str {
        match self {
            HostFilter::All => "All Hosts",
            HostFilter::Host(host) => host,
        }
    }

    pub fn apply(&self, window: &RollingWindow) -> Vec<Sample> {
        window.iter().filter(|s| self.matches(s)).cloned().collect()
    }
}

/// Hosts present in either window, memory first
pub fn hosts(memory: &RollingWindow, cpu: &RollingWindow) -> Vec<String> {
    distinct_instances(memory.iter().chain(cpu.iter()))
}

/// One chart row: every host's value at a timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: i64,
    pub values: BTreeMap<String, f64>,
}

/// Group samples by timestamp, timestamps in first-seen order.
/// A host reporting twice at one timestamp keeps its last value.
pub fn pivot(samples: &[Sample]) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = Vec::new();

    for sample in samples {
        match points.iter_mut().find(|p| p.timestamp == sample.timestamp) {
            Some(point) => {
                point.values.insert(sample.instance.clone(), sample.value);
            }
            None => {
                let mut values = BTreeMap::new();
                values.insert(sample.instance.clone(), sample.value);
                points.push(ChartPoint {
                    timestamp: sample.timestamp,
                    values,
                });
            }
        }
    }

    points
}

/// Per-host `(x, y)` series for terminal charts; x is seconds since the oldest sample
pub fn by_host(samples: &[Sample]) -> Vec<(String, Vec<(f64, f64)>)> {
    let origin = samples.iter().map(|s| s.timestamp).min().unwrap_or(0);

    distinct_instances(samples.iter())
        .into_iter()
        .map(|host| {
            let points = samples
                .iter()
                .filter(|s| s.instance == host)
                .map(|s| ((s.timestamp - origin) as f64 / 1000.0, s.value))
                .collect();
            (host, points)
        })
        .collect()
}

/// (min, max) of the sample values, widened so a flat line is still drawable
pub fn value_bounds(samples: &[Sample]) -> (f64, f64) {
    let mut values = samples.iter().map(|s| s.value);
    let Some(first) = values.next() else {
        return (0.0, 1.0);
    };
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if (max - min).abs() < f64::EPSILON {
        (min.min(0.0), max + 1.0)
    } else {
        (min.min(0.0), max)
    }
}
