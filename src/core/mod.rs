pub mod config;
pub mod error;
pub mod listing;
pub mod models;
pub mod normalize;
pub mod poller;
pub mod prometheus;
pub mod recorder;
pub mod series;
pub mod store;
pub mod topology;
pub mod window;

pub use config::{Settings, SettingsOverrides};
pub use error::DashError;
pub use models::{ContainerRecord, ContainerStatus, MetricKind, Sample, Snapshot};
pub use poller::{MetricsPoller, PollOutcome, PollerControl, PollerHandle};
pub use prometheus::{MetricsSource, PrometheusClient};
pub use store::SnapshotStore;
pub use window::RollingWindow;
