/// Per-tick snapshot summaries and their recording as text, JSON lines or CSV

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;

use crate::core::listing::StatsOverview;
use crate::core::models::Snapshot;
use crate::core::series::hosts;
use crate::utils::{format_mb, format_percent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostReading {
    pub instance: String,
    pub memory_mb: Option<f64>,
    pub cpu_percent: Option<f64>,
}

/// Condensed view of one snapshot: counts plus each host's latest readings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub tick: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub stats: StatsOverview,
    pub hosts: Vec<HostReading>,
}

impl SnapshotSummary {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let readings = hosts(&snapshot.memory, &snapshot.cpu)
            .into_iter()
            .map(|instance| HostReading {
                memory_mb: snapshot.memory.latest_for(&instance).map(|s| s.value),
                cpu_percent: snapshot.cpu.latest_for(&instance).map(|s| s.value),
                instance,
            })
            .collect();

        Self {
            tick: snapshot.tick,
            updated_at: snapshot.updated_at,
            stats: StatsOverview::from_containers(&snapshot.containers),
            hosts: readings,
        }
    }

    /// Single-line human readable form
    pub fn to_line(&self) -> String {
        let time = self
            .updated_at
            .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());

        let mut line = format!(
            "[{}] tick {} | containers {} ({} running, {} stopped) | targets {}",
            time, self.tick, self.stats.total, self.stats.running, self.stats.stopped, self.stats.targets
        );

        for host in &self.hosts {
            line.push_str(&format!(
                " | {} mem {} cpu {}",
                host.instance,
                host.memory_mb.map(format_mb).unwrap_or_else(|| "-".to_string()),
                host.cpu_percent.map(format_percent).unwrap_or_else(|| "-".to_string()),
            ));
        }

        line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Text,
    Json,
    Csv,
}

impl FromStr for RecordFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(RecordFormat::Text),
            "json" => Ok(RecordFormat::Json),
            "csv" => Ok(RecordFormat::Csv),
            other => Err(format!("unknown record format `{}` (text, json, csv)", other)),
        }
    }
}

const CSV_HEADER: &str = "timestamp,tick,instance,memory_mb,cpu_percent,containers,running,stopped";

/// Quote a CSV field when it holds a separator, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub struct SnapshotRecorder<W: Write> {
    writer: W,
    format: RecordFormat,
}

impl<W: Write> SnapshotRecorder<W> {
    /// Create a recorder; CSV output gets its header immediately
    pub fn new(mut writer: W, format: RecordFormat) -> Result<Self> {
        if format == RecordFormat::Csv {
            writeln!(writer, "{}", CSV_HEADER)?;
        }
        Ok(Self { writer, format })
    }

    pub fn record(&mut self, summary: &SnapshotSummary) -> Result<()> {
        match self.format {
            RecordFormat::Json => {
                let json = serde_json::to_string(summary)?;
                writeln!(self.writer, "{}", json)?;
            }
            RecordFormat::Csv => {
                let timestamp = summary
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                // One row per host; a tick without hosts still gets a row
                if summary.hosts.is_empty() {
                    writeln!(
                        self.writer,
                        "{},{},,,,{},{},{}",
                        timestamp, summary.tick, summary.stats.total, summary.stats.running, summary.stats.stopped
                    )?;
                }
                for host in &summary.hosts {
                    writeln!(
                        self.writer,
                        "{},{},{},{},{},{},{},{}",
                        timestamp,
                        summary.tick,
                        csv_field(&host.instance),
                        host.memory_mb.map(|v| format!("{:.3}", v)).unwrap_or_default(),
                        host.cpu_percent.map(|v| format!("{:.3}", v)).unwrap_or_default(),
                        summary.stats.total,
                        summary.stats.running,
                        summary.stats.stopped
                    )?;
                }
            }
            RecordFormat::Text => {
                writeln!(self.writer, "{}", summary.to_line())?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
