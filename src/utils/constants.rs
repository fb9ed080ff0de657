/// Dashboard constants: Prometheus queries, polling defaults and label names
///
/// Query expressions match the series exported by docker-exporter.

/// Path of the Prometheus instant-query endpoint, appended to the base URL
pub const QUERY_PATH: &str = "/api/v1/query";

pub const STATUS_QUERY: &str = "container_status";
pub const IMAGE_QUERY: &str = "container_image";
pub const UPTIME_QUERY: &str = "container_uptime_seconds";
pub const CPU_QUERY: &str = "sum(rate(process_cpu_seconds_total[1m])) by (instance)";
pub const MEMORY_QUERY: &str = "sum(process_resident_memory_bytes) by (instance)";

/// Label carrying the container name on container_* series
pub const LABEL_CONTAINER_NAME: &str = "container_name";
/// Label carrying the container id on container_status
pub const LABEL_CONTAINER_ID: &str = "container_id";
/// Label carrying the image reference on container_image
pub const LABEL_IMAGE: &str = "image";
/// Scrape target that reported the series
pub const LABEL_INSTANCE: &str = "instance";

/// Status value reported for a running container
pub const STATUS_RUNNING_VALUE: &str = "1";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
/// Samples kept per monitored host in each rolling window
pub const DEFAULT_POINTS_PER_HOST: usize = 20;
/// Largest accepted per-host window allowance
pub const MAX_POINTS_PER_HOST: usize = 10_000;

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Base URL compiled in by build.rs for the selected build mode
pub const BUILD_DEFAULT_API_BASE_URL: &str = env!("DOCKMON_DEFAULT_API_BASE_URL");
pub const BUILD_MODE: &str = env!("DOCKMON_BUILD_MODE");

/// Runtime environment overrides (also read from .env)
pub const ENV_API_BASE_URL: &str = "DOCKMON_API_BASE_URL";
pub const ENV_POLL_INTERVAL: &str = "DOCKMON_POLL_INTERVAL";
pub const ENV_WEB_TOKEN: &str = "DOCKMON_WEB_TOKEN";

/// Every query issued on a poll tick, in the order they are reported in logs
pub const ALL_QUERIES: &[&str] = &[
    STATUS_QUERY,
    IMAGE_QUERY,
    UPTIME_QUERY,
    CPU_QUERY,
    MEMORY_QUERY,
];
