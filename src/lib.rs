//! dockmon: terminal and HTTP dashboard for Docker exporter metrics
//!
//! A single poller task queries Prometheus on an interval, joins container
//! labels into a container list, keeps bounded CPU/memory windows and
//! publishes an immutable [`core::Snapshot`] that the TUI, CLI and HTTP
//! server all read.

pub mod app;
pub mod cli;
pub mod core;
pub mod logging;
pub mod screens;
pub mod server;
pub mod utils;
