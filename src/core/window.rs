/// Rolling sample windows
///
/// One window per metric kind holds samples from every host in insertion
/// order. After each append the window is cut back to its bound, oldest first.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::core::models::Sample;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollingWindow {
    samples: VecDeque<Sample>,
}

impl RollingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch then evict from the front until `len <= bound`.
    /// A bound of zero clears the window. Returns the number of evicted samples.
    pub fn extend_bounded(&mut self, batch: Vec<Sample>, bound: usize) -> usize {
        self.samples.extend(batch);

        let excess = self.samples.len().saturating_sub(bound);
        self.samples.drain(..excess);
        excess
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Most recent sample reported by `instance`
    pub fn latest_for(&self, instance: &str) -> Option<&Sample> {
        self.samples.iter().rev().find(|s| s.instance == instance)
    }

    /// Distinct instances in first-seen order
    pub fn instances(&self) -> Vec<String> {
        distinct_instances(self.samples.iter())
    }
}

/// Distinct instances across samples, first-seen order
pub fn distinct_instances<'a, I>(samples: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut seen = HashSet::new();
    let mut instances = Vec::new();
    for sample in samples {
        if seen.insert(sample.instance.as_str()) {
            instances.push(sample.instance.clone());
        }
    }
    instances
}

/// Window bound for a tick: distinct hosts across both kinds' new samples
/// times the per-host allowance
pub fn window_bound(memory: &[Sample], cpu: &[Sample], points_per_host: usize) -> usize {
    let hosts: HashSet<&str> = memory
        .iter()
        .chain(cpu.iter())
        .map(|s| s.instance.as_str())
        .collect();
    hosts.len().saturating_mul(points_per_host)
}
