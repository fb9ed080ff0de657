/// Snapshot data model: containers, samples and metric kinds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::window::RollingWindow;
use crate::utils::{BYTES_PER_MB, CPU_QUERY, MEMORY_QUERY, STATUS_RUNNING_VALUE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
}

impl ContainerStatus {
    /// Map the raw container_status sample value; only "1" means running
    pub fn from_value(raw: &str) -> Self {
        if raw == STATUS_RUNNING_VALUE {
            ContainerStatus::Running
        } else {
            ContainerStatus::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Running => "running",
            ContainerStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(ContainerStatus::Running),
            "stopped" => Ok(ContainerStatus::Stopped),
            other => Err(format!("unknown container status `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    /// Seconds since the container started
    pub uptime: f64,
    pub instance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch, shared by every sample of a tick
    pub timestamp: i64,
    pub instance: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Memory,
    Cpu,
}

impl MetricKind {
    pub fn all() -> &'static [MetricKind] {
        &[MetricKind::Memory, MetricKind::Cpu]
    }

    pub fn query(&self) -> &'static str {
        match self {
            MetricKind::Memory => MEMORY_QUERY,
            MetricKind::Cpu => CPU_QUERY,
        }
    }

    /// Convert a raw backend value: bytes to MiB, CPU seconds/s to percent
    pub fn convert(&self, raw: f64) -> f64 {
        match self {
            MetricKind::Memory => raw / BYTES_PER_MB,
            MetricKind::Cpu => raw * 100.0,
        }
    }

    pub fn unit_suffix(&self) -> &'static str {
        match self {
            MetricKind::Memory => " MB",
            MetricKind::Cpu => "%",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MetricKind::Memory => "Memory Usage (MB)",
            MetricKind::Cpu => "CPU Usage",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Memory => "memory",
            MetricKind::Cpu => "cpu",
        }
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(MetricKind::Memory),
            "cpu" => Ok(MetricKind::Cpu),
            other => Err(format!("unknown metric kind `{}`", other)),
        }
    }
}

/// Materialized view handed to every consumer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub containers: Vec<ContainerRecord>,
    pub memory: RollingWindow,
    pub cpu: RollingWindow,
    /// Time of the last successful tick
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of successful ticks so far
    pub tick: u64,
}

impl Snapshot {
    pub fn window(&self, kind: MetricKind) -> &RollingWindow {
        match kind {
            MetricKind::Memory => &self.memory,
            MetricKind::Cpu => &self.cpu,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tick == 0
    }
}
