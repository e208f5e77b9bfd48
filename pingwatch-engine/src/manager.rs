//! The MonitorManager type: owns one monitor per host and the shared
//! interval, event queue and lifecycle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use pingwatch_types::{HostId, HostStats, Snapshot, DEFAULT_HISTORY_CAPACITY};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::error::ManagerError;
use crate::monitor::{MonitorContext, MonitorExit, MonitorHandle, MonitorState};
use crate::prober::{Prober, DEFAULT_PROBE_TIMEOUT};
use crate::sink::{EventSink, EventStream, DEFAULT_QUEUE_CAPACITY};
use crate::system::SystemPingProber;
use crate::{Result, DEFAULT_INTERVAL, MIN_INTERVAL_SECS};

/// Owns the set of host monitors and multiplexes their updates into one
/// [`EventStream`].
///
/// All operations are synchronous and safe to call from any thread. Monitors
/// run as tasks on the tokio runtime the manager was built in (or the one
/// passed to [`ManagerBuilder::runtime`]).
///
/// Dropping the manager shuts it down.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use pingwatch_engine::MonitorManager;
///
/// #[tokio::main]
/// async fn main() -> Result<(), pingwatch_engine::ManagerError> {
///     let manager = MonitorManager::builder()
///         .interval(Duration::from_secs(2))
///         .hosts(["1.1.1.1", "example.com"])
///         .build()?;
///
///     tokio::time::sleep(Duration::from_secs(10)).await;
///
///     for (host, stats) in manager.snapshot().iter() {
///         println!("{host}: {} ({:.1}% up)", stats.status, stats.uptime_percent());
///     }
///
///     manager.set_interval(0.5)?;
///     manager.remove_host("example.com")?;
///     manager.shutdown();
///     Ok(())
/// }
/// ```
pub struct MonitorManager {
    monitors: RwLock<BTreeMap<HostId, MonitorHandle>>,
    ctx: MonitorContext,
    interval_tx: watch::Sender<Duration>,
    runtime: Handle,
    shut_down: AtomicBool,
}

impl MonitorManager {
    /// Create a builder for configuring the manager.
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Start monitoring a host.
    ///
    /// `host` may be a bare hostname, an IP address, or a URL; it is
    /// normalized first. Adding a host that is already monitored is a no-op
    /// returning the same identifier, unless its monitor task has exited
    /// (its prober panicked), in which case a fresh monitor replaces it.
    pub fn add_host(&self, host: &str) -> Result<HostId> {
        let host = HostId::parse(host)?;

        let mut monitors = self.monitors.write();
        if self.is_shut_down() {
            return Err(ManagerError::ShutDown);
        }
        match monitors.get(&host).map(MonitorHandle::state) {
            Some(MonitorState::Stopped) => {
                tracing::warn!(host = %host, "restarting exited host monitor");
            }
            Some(_) => {
                tracing::debug!(host = %host, "host already monitored");
                return Ok(host);
            }
            None => {}
        }

        let handle = MonitorHandle::spawn(host.clone(), &self.ctx, &self.runtime);
        monitors.insert(host.clone(), handle);
        tracing::info!(host = %host, hosts = monitors.len(), "monitoring host");

        Ok(host)
    }

    /// Stop monitoring a host and discard its statistics.
    ///
    /// Returns once the monitor has been told to stop; it may still be
    /// finishing an in-flight probe. From the moment this returns, no event
    /// for the host is delivered, including events already queued. Await
    /// [`MonitorExit::stopped`] to wait for the task itself.
    pub fn remove_host(&self, host: impl AsRef<str>) -> Result<MonitorExit> {
        let raw = host.as_ref();
        let host =
            HostId::parse(raw).map_err(|_| ManagerError::NotFound(raw.trim().to_string()))?;

        let mut monitors = self.monitors.write();
        if self.is_shut_down() {
            return Err(ManagerError::ShutDown);
        }
        let handle = monitors
            .remove(&host)
            .ok_or_else(|| ManagerError::NotFound(host.to_string()))?;

        // Stop and purge before a re-add of the same host can take the lock
        handle.stop();
        let purged = self.ctx.sink.purge_host(&host);
        drop(monitors);

        tracing::info!(host = %host, purged, "stopped monitoring host");

        Ok(handle.into_exit())
    }

    /// Change the probe interval for every monitor.
    ///
    /// Fails if `seconds` is below [`MIN_INTERVAL_SECS`] or not finite. Each
    /// monitor picks the new value up when it next schedules a probe; a wait
    /// already in progress is not cut short.
    pub fn set_interval(&self, seconds: f64) -> Result<()> {
        let interval = interval_from_secs(seconds)?;
        if self.is_shut_down() {
            return Err(ManagerError::ShutDown);
        }

        let previous = self.interval_tx.send_replace(interval);
        if previous != interval {
            tracing::info!(
                interval_ms = interval.as_millis() as u64,
                previous_ms = previous.as_millis() as u64,
                "probe interval changed"
            );
        }
        Ok(())
    }

    /// Current probe interval.
    pub fn interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    /// Time each probe is given before it counts as a failure.
    pub fn probe_timeout(&self) -> Duration {
        self.ctx.probe_timeout
    }

    /// Point-in-time copy of every monitored host's statistics.
    ///
    /// Never waits on a probe.
    pub fn snapshot(&self) -> Snapshot {
        self.monitors
            .read()
            .values()
            .map(MonitorHandle::stats)
            .collect()
    }

    /// Copy of one host's statistics.
    pub fn stats(&self, host: impl AsRef<str>) -> Result<HostStats> {
        self.with_monitor(host.as_ref(), MonitorHandle::stats)
    }

    /// Lifecycle state of one host's monitor.
    pub fn monitor_state(&self, host: impl AsRef<str>) -> Result<MonitorState> {
        self.with_monitor(host.as_ref(), MonitorHandle::state)
    }

    /// Monitored hosts, in sorted order.
    pub fn hosts(&self) -> Vec<HostId> {
        self.monitors.read().keys().cloned().collect()
    }

    /// Check whether `host` (after normalization) is monitored.
    pub fn contains(&self, host: impl AsRef<str>) -> bool {
        HostId::parse(host.as_ref()).is_ok_and(|host| self.monitors.read().contains_key(&host))
    }

    /// Number of monitored hosts.
    pub fn len(&self) -> usize {
        self.monitors.read().len()
    }

    /// Check if no host is monitored.
    pub fn is_empty(&self) -> bool {
        self.monitors.read().is_empty()
    }

    /// Consumer handle for update events.
    ///
    /// Every call returns a handle onto the same queue.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.ctx.sink.clone())
    }

    /// Check if [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Stop every monitor and close the event stream.
    ///
    /// Queued events are discarded and nothing more is published. Idempotent;
    /// later mutations fail with [`ManagerError::ShutDown`].
    pub fn shutdown(&self) {
        self.stop_all();
    }

    /// Like [`shutdown`](Self::shutdown), then wait up to `timeout` for the
    /// monitor tasks to exit.
    ///
    /// Tasks still running at the deadline are aborted. Returns `true` if all
    /// of them exited in time.
    pub async fn shutdown_gracefully(&self, timeout: Duration) -> bool {
        let exits = self.stop_all();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut clean = true;

        for exit in exits {
            let host = exit.host().clone();
            let abort = exit.abort_handle();
            if tokio::time::timeout_at(deadline, exit.stopped()).await.is_err() {
                tracing::warn!(host = %host, "host monitor did not stop in time, aborting");
                abort.abort();
                clean = false;
            }
        }

        clean
    }

    fn stop_all(&self) -> Vec<MonitorExit> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }

        let monitors = std::mem::take(&mut *self.monitors.write());
        for handle in monitors.values() {
            handle.stop();
        }
        self.ctx.sink.close();

        tracing::info!(hosts = monitors.len(), "monitor manager shut down");
        monitors.into_values().map(MonitorHandle::into_exit).collect()
    }

    fn with_monitor<T>(&self, raw: &str, f: impl FnOnce(&MonitorHandle) -> T) -> Result<T> {
        let not_found = || ManagerError::NotFound(raw.trim().to_string());
        let host = HostId::parse(raw).map_err(|_| not_found())?;
        let monitors = self.monitors.read();
        monitors.get(&host).map(f).ok_or_else(not_found)
    }
}

impl Drop for MonitorManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl std::fmt::Debug for MonitorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorManager")
            .field("hosts", &self.len())
            .field("interval", &self.interval())
            .field("probe_timeout", &self.ctx.probe_timeout)
            .field("prober", &self.ctx.prober.name())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

fn interval_from_secs(seconds: f64) -> Result<Duration> {
    if !seconds.is_finite() || seconds < MIN_INTERVAL_SECS {
        return Err(ManagerError::InvalidInterval(seconds));
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| ManagerError::InvalidInterval(seconds))
}

/// Builder for configuring a [`MonitorManager`].
#[derive(Debug, Default)]
pub struct ManagerBuilder {
    prober: Option<Arc<dyn Prober>>,
    interval: Option<Duration>,
    probe_timeout: Option<Duration>,
    history_capacity: Option<usize>,
    queue_capacity: Option<usize>,
    runtime: Option<Handle>,
    hosts: Vec<String>,
}

impl ManagerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prober used by every monitor.
    ///
    /// Default: [`SystemPingProber`].
    pub fn prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Set the initial probe interval.
    ///
    /// Default: 1 second. Must be at least [`MIN_INTERVAL_SECS`].
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the time each probe is given.
    ///
    /// Default: 1 second.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Set how many history entries each host keeps.
    ///
    /// Default: 120.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    /// Set how many events are queued before the oldest is dropped.
    ///
    /// Default: 1000.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Spawn monitors on this runtime instead of the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Hosts to start monitoring as soon as the manager is built.
    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    /// Build the manager and start monitoring the initial hosts.
    ///
    /// Fails if the interval or timeout is invalid, if any initial host is
    /// invalid, or if there is no tokio runtime to spawn monitors on.
    pub fn build(self) -> Result<MonitorManager> {
        let interval = self.interval.unwrap_or(DEFAULT_INTERVAL);
        if interval.as_secs_f64() < MIN_INTERVAL_SECS {
            return Err(ManagerError::InvalidInterval(interval.as_secs_f64()));
        }

        let probe_timeout = self.probe_timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT);
        if probe_timeout.is_zero() {
            return Err(ManagerError::InvalidTimeout);
        }

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ManagerError::NoRuntime)?,
        };

        let prober = self
            .prober
            .unwrap_or_else(|| Arc::new(SystemPingProber::new()));
        let (interval_tx, interval_rx) = watch::channel(interval);
        let sink = Arc::new(EventSink::new(
            self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
        ));

        let manager = MonitorManager {
            monitors: RwLock::new(BTreeMap::new()),
            ctx: MonitorContext {
                prober,
                probe_timeout,
                history_capacity: self.history_capacity.unwrap_or(DEFAULT_HISTORY_CAPACITY),
                interval: interval_rx,
                sink,
            },
            interval_tx,
            runtime,
            shut_down: AtomicBool::new(false),
        };

        tracing::debug!(
            prober = manager.ctx.prober.name(),
            ?interval,
            ?probe_timeout,
            "monitor manager started"
        );

        // A failure here drops the manager, which stops the hosts added so far
        for host in &self.hosts {
            manager.add_host(host)?;
        }

        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingwatch_types::ProbeResult;

    #[derive(Debug)]
    struct NoopProber;

    #[async_trait::async_trait]
    impl Prober for NoopProber {
        async fn probe(&self, _host: &HostId, _timeout: Duration) -> ProbeResult {
            ProbeResult::success(1.0, "noop")
        }

        fn name(&self) -> &str {
            "noop"
        }
    }

    fn manager() -> MonitorManager {
        MonitorManager::builder()
            .prober(Arc::new(NoopProber))
            .build()
            .unwrap()
    }

    #[test]
    fn build_without_runtime_fails() {
        let err = MonitorManager::builder()
            .prober(Arc::new(NoopProber))
            .build()
            .unwrap_err();
        assert!(matches!(err, ManagerError::NoRuntime));
    }

    #[test]
    fn build_with_explicit_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let manager = MonitorManager::builder()
            .prober(Arc::new(NoopProber))
            .runtime(runtime.handle().clone())
            .hosts(["10.0.0.1"])
            .build()
            .unwrap();

        assert_eq!(manager.len(), 1);
        manager.shutdown();
    }

    #[tokio::test]
    async fn builder_rejects_bad_settings() {
        let err = MonitorManager::builder()
            .interval(Duration::from_millis(100))
            .build()
            .unwrap_err();
        assert!(matches!(err, ManagerError::InvalidInterval(_)));

        let err = MonitorManager::builder()
            .probe_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, ManagerError::InvalidTimeout));

        let err = MonitorManager::builder()
            .prober(Arc::new(NoopProber))
            .hosts(["10.0.0.1", "  "])
            .build()
            .unwrap_err();
        assert!(matches!(err, ManagerError::InvalidHost(_)));
    }

    #[tokio::test]
    async fn register_same_host_twice_returns_same_monitor() {
        let manager = manager();
        let a = manager.add_host("Example.COM").unwrap();
        let b = manager.add_host("https://example.com/status").unwrap();

        assert_eq!(a, b);
        assert_eq!(manager.len(), 1);
        assert!(manager.contains("example.com."));
    }

    #[tokio::test]
    async fn add_invalid_host_fails_without_adding() {
        let manager = manager();
        let err = manager.add_host("").unwrap_err();
        assert!(matches!(err, ManagerError::InvalidHost(_)));
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn unknown_host_lookups_are_not_found() {
        let manager = manager();
        assert!(matches!(
            manager.remove_host("nowhere.example"),
            Err(ManagerError::NotFound(h)) if h == "nowhere.example"
        ));
        assert!(matches!(manager.stats("nowhere.example"), Err(ManagerError::NotFound(_))));
        assert!(matches!(manager.monitor_state(""), Err(ManagerError::NotFound(_))));
    }

    #[tokio::test]
    async fn interval_floor_is_enforced() {
        let manager = manager();
        assert!(matches!(
            manager.set_interval(0.1),
            Err(ManagerError::InvalidInterval(_))
        ));
        assert!(manager.set_interval(f64::NAN).is_err());
        assert!(manager.set_interval(f64::INFINITY).is_err());
        assert_eq!(manager.interval(), DEFAULT_INTERVAL);

        manager.set_interval(MIN_INTERVAL_SECS).unwrap();
        assert_eq!(manager.interval(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn mutations_after_shutdown_fail() {
        let manager = manager();
        manager.add_host("10.0.0.1").unwrap();
        manager.shutdown();
        manager.shutdown();

        assert!(manager.is_shut_down());
        assert!(manager.is_empty());
        assert!(manager.events().is_closed());
        assert!(matches!(manager.add_host("10.0.0.2"), Err(ManagerError::ShutDown)));
        assert!(matches!(manager.set_interval(2.0), Err(ManagerError::ShutDown)));
        assert!(matches!(manager.remove_host("10.0.0.1"), Err(ManagerError::ShutDown)));
    }

    #[tokio::test]
    async fn debug_names_prober() {
        let manager = manager();
        let debug = format!("{manager:?}");
        assert!(debug.contains("noop"));
        assert!(debug.contains("MonitorManager"));
    }
}
