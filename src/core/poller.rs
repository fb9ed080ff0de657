/// Metrics poller
///
/// Each tick fetches the five dashboard queries concurrently, joins them into
/// a fresh container list, appends the CPU/memory samples to the rolling
/// windows and publishes the result. A failed tick leaves the previous
/// snapshot in place; the loop keeps running until stopped.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::core::config::Settings;
use crate::core::error::DashError;
use crate::core::models::{MetricKind, Snapshot};
use crate::core::normalize::{join_containers, samples_from};
use crate::core::prometheus::{MetricsSource, PrometheusClient, QueryResult};
use crate::core::store::SnapshotStore;
use crate::core::window::window_bound;
use crate::utils::{IMAGE_QUERY, STATUS_QUERY, UPTIME_QUERY};

/// Shortest period accepted by the polling loop
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Raw results of one tick
#[derive(Debug, Clone, Default)]
pub struct QueryBatch {
    pub status: Vec<QueryResult>,
    pub image: Vec<QueryResult>,
    pub uptime: Vec<QueryResult>,
    pub cpu: Vec<QueryResult>,
    pub memory: Vec<QueryResult>,
}

/// Issue the five queries concurrently; the first failure fails the batch
pub async fn fetch_batch<S: MetricsSource + ?Sized>(source: &S) -> Result<QueryBatch, DashError> {
    let (status, image, uptime, cpu, memory) = tokio::try_join!(
        source.query(STATUS_QUERY),
        source.query(IMAGE_QUERY),
        source.query(UPTIME_QUERY),
        source.query(MetricKind::Cpu.query()),
        source.query(MetricKind::Memory.query()),
    )?;

    Ok(QueryBatch {
        status,
        image,
        uptime,
        cpu,
        memory,
    })
}

/// Fold a batch into the previous snapshot
pub fn next_snapshot(
    previous: &Snapshot,
    batch: QueryBatch,
    now: DateTime<Utc>,
    points_per_host: usize,
) -> Snapshot {
    let timestamp = now.timestamp_millis();

    let containers = join_containers(&batch.status, &batch.image, &batch.uptime);
    let memory = samples_from(MetricKind::Memory, &batch.memory, timestamp);
    let cpu = samples_from(MetricKind::Cpu, &batch.cpu, timestamp);

    let bound = window_bound(&memory, &cpu, points_per_host);

    let mut memory_window = previous.memory.clone();
    let mut cpu_window = previous.cpu.clone();
    let evicted = memory_window.extend_bounded(memory, bound)
        + cpu_window.extend_bounded(cpu, bound);

    debug!(
        containers = containers.len(),
        bound,
        evicted,
        "folded poll results into snapshot"
    );

    Snapshot {
        containers,
        memory: memory_window,
        cpu: cpu_window,
        updated_at: Some(now),
        tick: previous.tick + 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Updated,
    /// Another cycle was still running
    Skipped,
}

/// Holds the single-flight flag for the duration of a cycle
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct MetricsPoller<S> {
    source: S,
    store: SnapshotStore,
    points_per_host: usize,
    in_flight: AtomicBool,
}

impl<S: MetricsSource> MetricsPoller<S> {
    pub fn new(source: S, store: SnapshotStore, points_per_host: usize) -> Self {
        Self {
            source,
            store,
            points_per_host,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run one cycle. On error nothing is published.
    pub async fn poll_once(&self) -> Result<PollOutcome, DashError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("poll cycle already in flight, skipping");
            return Ok(PollOutcome::Skipped);
        };

        let batch = fetch_batch(&self.source).await?;
        let previous = self.store.current();
        let snapshot = next_snapshot(&previous, batch, Utc::now(), self.points_per_host);

        debug!(
            tick = snapshot.tick,
            containers = snapshot.containers.len(),
            memory_samples = snapshot.memory.len(),
            cpu_samples = snapshot.cpu.len(),
            "publishing snapshot"
        );
        self.store.publish(snapshot);

        Ok(PollOutcome::Updated)
    }

    async fn tick(&self) {
        match self.poll_once().await {
            Ok(PollOutcome::Updated) | Ok(PollOutcome::Skipped) => {}
            Err(e) => {
                warn!(error = %e, "failed to fetch metrics, keeping previous snapshot");
            }
        }
    }
}

impl<S: MetricsSource + 'static> MetricsPoller<S> {
    /// Start the polling loop: one tick immediately, then every `interval`
    pub fn spawn(self: Arc<Self>, interval: Duration) -> PollerHandle {
        let period = interval.max(MIN_POLL_INTERVAL);
        let control = PollerControl::default();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let refresh = control.clone();
        let task = tokio::spawn(async move {
            info!(interval_ms = period.as_millis() as u64, "metrics poller started");

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = refresh.notified() => {
                        debug!("manual refresh requested");
                        ticker.reset();
                    }
                    _ = ticker.tick() => {}
                }

                self.tick().await;
            }

            info!("metrics poller stopped");
        });

        PollerHandle {
            control,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

/// Connect to the configured backend and start the polling loop
pub fn start(settings: &Settings) -> Result<(SnapshotStore, PollerHandle), DashError> {
    let client = PrometheusClient::new(&settings.api_base_url)?;
    let store = SnapshotStore::new();
    let poller = Arc::new(MetricsPoller::new(client, store.clone(), settings.points_per_host));
    let handle = poller.spawn(settings.poll_interval);
    Ok((store, handle))
}

/// Run a single cycle against the configured backend and return its snapshot
pub async fn fetch_snapshot(settings: &Settings) -> Result<Arc<Snapshot>, DashError> {
    let client = PrometheusClient::new(&settings.api_base_url)?;
    let poller = MetricsPoller::new(client, SnapshotStore::new(), settings.points_per_host);
    poller.poll_once().await?;
    Ok(poller.store().current())
}

/// Cloneable trigger for out-of-band refreshes
#[derive(Debug, Clone, Default)]
pub struct PollerControl {
    notify: Arc<Notify>,
}

impl PollerControl {
    /// Ask the loop to tick now. Requests made while a cycle runs collapse
    /// into a single follow-up tick.
    pub fn request_refresh(&self) {
        self.notify.notify_one();
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Owner of a running poll loop. Dropping the handle also ends the loop.
pub struct PollerHandle {
    control: PollerControl,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn control(&self) -> PollerControl {
        self.control.clone()
    }

    pub fn refresh(&self) {
        self.control.request_refresh();
    }

    /// Stop scheduling ticks and wait for the loop to exit. A cycle already
    /// in flight runs to completion.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "metrics poller task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ContainerRecord, ContainerStatus, Sample};
    use crate::core::prometheus::MockMetricsSource;
    use crate::core::window::RollingWindow;
    use crate::utils::{CPU_QUERY, MEMORY_QUERY};
    use async_trait::async_trait;

    fn healthy_source() -> MockMetricsSource {
        let mut source = MockMetricsSource::new();
        source.expect_query().returning(|expr| {
            let results = match expr {
                STATUS_QUERY => vec![QueryResult::new(
                    &[("container_name", "web"), ("instance", "h1"), ("container_id", "c1")],
                    "1",
                )],
                IMAGE_QUERY => vec![QueryResult::new(
                    &[("container_name", "web"), ("instance", "h1"), ("image", "nginx:latest")],
                    "1",
                )],
                UPTIME_QUERY => vec![QueryResult::new(&[("container_name", "web"), ("instance", "h1")], "42")],
                CPU_QUERY => vec![QueryResult::new(&[("instance", "h1")], "0.02")],
                MEMORY_QUERY => vec![QueryResult::new(&[("instance", "h1")], "104857600")],
                _ => Vec::new(),
            };
            Ok(results)
        });
        source
    }

    fn previous_snapshot() -> Snapshot {
        Snapshot {
            containers: vec![ContainerRecord {
                id: "old".to_string(),
                name: "old".to_string(),
                image: "busybox".to_string(),
                status: ContainerStatus::Stopped,
                uptime: 0.0,
                instance: "h0".to_string(),
            }],
            tick: 7,
            ..Snapshot::default()
        }
    }

    #[tokio::test]
    async fn test_poll_once_publishes_joined_snapshot() {
        let store = SnapshotStore::new();
        let poller = MetricsPoller::new(healthy_source(), store.clone(), 20);

        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Updated);

        let snapshot = store.current();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.containers.len(), 1);
        let web = &snapshot.containers[0];
        assert_eq!(web.id, "c1");
        assert_eq!(web.image, "nginx:latest");
        assert_eq!(web.status, ContainerStatus::Running);
        assert_eq!(web.uptime, 42.0);
        assert_eq!(snapshot.memory.latest_for("h1").map(|s| s.value), Some(100.0));
        assert_eq!(snapshot.cpu.latest_for("h1").map(|s| s.value), Some(2.0));
        assert!(snapshot.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_status_query_keeps_previous_snapshot() {
        let store = SnapshotStore::with_snapshot(previous_snapshot());
        let before = store.current();

        let mut source = MockMetricsSource::new();
        source.expect_query().returning(|expr| {
            if expr == STATUS_QUERY {
                Err(DashError::Status {
                    query: expr.to_string(),
                    status: 503,
                })
            } else {
                Ok(Vec::new())
            }
        });

        let poller = MetricsPoller::new(source, store.clone(), 20);
        assert!(poller.poll_once().await.is_err());

        let after = store.current();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.containers[0].id, "old");
        assert_eq!(after.tick, 7);
    }

    #[tokio::test]
    async fn test_container_list_is_replaced_wholesale() {
        let store = SnapshotStore::with_snapshot(previous_snapshot());
        let poller = MetricsPoller::new(healthy_source(), store.clone(), 20);
        poller.poll_once().await.unwrap();

        let snapshot = store.current();
        assert_eq!(snapshot.tick, 8);
        assert!(snapshot.containers.iter().all(|c| c.id != "old"));
    }

    #[test]
    fn test_next_snapshot_bounds_windows_per_tick() {
        let memory: Vec<QueryResult> = (0..25)
            .map(|i| QueryResult::new(&[("instance", "h1")], &(i * 1024 * 1024).to_string()))
            .collect();
        let batch = QueryBatch {
            memory: memory.clone(),
            ..QueryBatch::default()
        };

        let t0 = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let t1 = DateTime::<Utc>::from_timestamp(1_700_000_005, 0).unwrap();

        let first = next_snapshot(&Snapshot::default(), batch.clone(), t0, 20);
        assert_eq!(first.memory.len(), 20);
        let second = next_snapshot(&first, batch, t1, 20);

        // 50 samples seen, 20 kept, all from the second tick
        assert_eq!(second.memory.len(), 20);
        assert!(second.memory.iter().all(|s| s.timestamp == t1.timestamp_millis()));
        let values: Vec<f64> = second.memory.iter().map(|s| s.value).collect();
        assert_eq!(values, (5..25).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_no_hosts_clears_windows() {
        let mut memory = RollingWindow::new();
        memory.extend_bounded(
            vec![Sample {
                timestamp: 1,
                instance: "h1".to_string(),
                value: 1.0,
            }],
            20,
        );
        let previous = Snapshot {
            memory,
            ..Snapshot::default()
        };

        let next = next_snapshot(&previous, QueryBatch::default(), Utc::now(), 20);
        assert!(next.memory.is_empty());
        assert!(next.cpu.is_empty());
        assert!(next.containers.is_empty());
    }

    struct SlowSource;

    #[async_trait]
    impl MetricsSource for SlowSource {
        async fn query(&self, _expr: &str) -> Result<Vec<QueryResult>, DashError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_skipped() {
        let poller = MetricsPoller::new(SlowSource, SnapshotStore::new(), 20);

        let (first, second) = tokio::join!(poller.poll_once(), poller.poll_once());
        assert_eq!(first.unwrap(), PollOutcome::Updated);
        assert_eq!(second.unwrap(), PollOutcome::Skipped);

        // The flag is released once the first cycle ends
        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Updated);
        assert_eq!(poller.store().current().tick, 2);
    }

    #[tokio::test]
    async fn test_spawned_loop_ticks_refreshes_and_stops() {
        let store = SnapshotStore::new();
        let mut rx = store.subscribe();
        let poller = Arc::new(MetricsPoller::new(healthy_source(), store.clone(), 20));

        let handle = poller.spawn(Duration::from_secs(3600));
        let wait = Duration::from_secs(5);

        // First tick fires immediately
        tokio::time::timeout(wait, rx.changed()).await.unwrap().unwrap();
        assert_eq!(rx.borrow_and_update().tick, 1);

        handle.refresh();
        tokio::time::timeout(wait, rx.changed()).await.unwrap().unwrap();
        assert_eq!(rx.borrow_and_update().tick, 2);

        tokio::time::timeout(wait, handle.stop()).await.unwrap();
    }
}
