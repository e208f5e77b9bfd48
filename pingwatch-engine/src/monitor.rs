//! Per-host background probing task.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pingwatch_types::{current_timestamp_ms, HostId, HostStats, ProbeResult, UpdateEvent};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

use crate::prober::Prober;
use crate::sink::EventSink;

/// Lifecycle of one host monitor.
///
/// Transitions only move forward: `Idle -> Running -> Stopping -> Stopped`.
/// A monitor stopped before its task first runs goes straight from `Idle`
/// to `Stopping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Created, task not yet running.
    Idle,
    /// Probing and publishing.
    Running,
    /// Stop requested; nothing more is published.
    Stopping,
    /// Task has exited.
    Stopped,
}

/// Everything a monitor shares with its manager and siblings.
#[derive(Debug, Clone)]
pub(crate) struct MonitorContext {
    pub(crate) prober: Arc<dyn Prober>,
    pub(crate) probe_timeout: Duration,
    pub(crate) history_capacity: usize,
    pub(crate) interval: watch::Receiver<Duration>,
    pub(crate) sink: Arc<EventSink>,
}

/// The task side: owns the host's statistics and is their only writer.
struct HostMonitor {
    host: HostId,
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    interval: watch::Receiver<Duration>,
    stop_rx: watch::Receiver<bool>,
    stats_tx: watch::Sender<HostStats>,
    state: Arc<Mutex<MonitorState>>,
    sink: Arc<EventSink>,
}

impl HostMonitor {
    async fn run(mut self) {
        let _exit = ExitGuard(self.state.clone());
        {
            let mut state = self.state.lock();
            if *state != MonitorState::Idle {
                return;
            }
            *state = MonitorState::Running;
        }

        tracing::debug!(host = %self.host, prober = self.prober.name(), "host monitor started");

        loop {
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = stop_requested(&mut self.stop_rx) => break,
                result = tokio::time::timeout(
                    self.probe_timeout,
                    self.prober.probe(&self.host, self.probe_timeout),
                ) => {
                    result.unwrap_or_else(|_| {
                        tracing::debug!(
                            host = %self.host,
                            timeout = ?self.probe_timeout,
                            "probe overran its timeout"
                        );
                        ProbeResult::timeout(self.probe_timeout)
                    })
                }
            };

            if !self.publish(&result) {
                break;
            }

            let interval = *self.interval.borrow();
            let wait = interval.saturating_sub(started.elapsed());

            tokio::select! {
                biased;
                _ = stop_requested(&mut self.stop_rx) => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        tracing::debug!(host = %self.host, "host monitor stopped");
    }

    /// Fold `result` into the stats and publish the new copy.
    ///
    /// Returns `false` without touching anything once a stop was requested,
    /// so a removed host never produces another event.
    fn publish(&self, result: &ProbeResult) -> bool {
        let timestamp_ms = current_timestamp_ms();

        let state = self.state.lock();
        if *state != MonitorState::Running {
            return false;
        }

        let mut copy = None;
        self.stats_tx.send_modify(|stats| {
            stats.record(timestamp_ms, result);
            copy = Some(stats.clone());
        });

        if let Some(stats) = copy {
            tracing::trace!(
                host = %self.host,
                success = result.success,
                latency_ms = ?result.latency_ms,
                sent = stats.sent,
                received = stats.received,
                "probe recorded"
            );
            self.sink.publish(UpdateEvent::new(stats, timestamp_ms));
        }

        drop(state);
        true
    }
}

/// Resolves once a stop is requested or the handle is gone.
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Marks the monitor stopped however the task ends.
struct ExitGuard(Arc<Mutex<MonitorState>>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        *self.0.lock() = MonitorState::Stopped;
    }
}

/// Manager-side handle to a running monitor.
pub(crate) struct MonitorHandle {
    host: HostId,
    stop_tx: watch::Sender<bool>,
    stats_rx: watch::Receiver<HostStats>,
    state: Arc<Mutex<MonitorState>>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Spawn a monitor for `host` on `runtime`.
    pub(crate) fn spawn(host: HostId, ctx: &MonitorContext, runtime: &Handle) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (stats_tx, stats_rx) = watch::channel(HostStats::with_history_capacity(
            host.clone(),
            ctx.history_capacity,
        ));
        let state = Arc::new(Mutex::new(MonitorState::Idle));

        let monitor = HostMonitor {
            host: host.clone(),
            prober: ctx.prober.clone(),
            probe_timeout: ctx.probe_timeout,
            interval: ctx.interval.clone(),
            stop_rx,
            stats_tx,
            state: state.clone(),
            sink: ctx.sink.clone(),
        };
        let task = runtime.spawn(monitor.run());

        Self {
            host,
            stop_tx,
            stats_rx,
            state,
            task,
        }
    }

    /// Request a stop. After this returns the monitor publishes nothing more.
    ///
    /// Returns `true` if this call made the transition.
    pub(crate) fn stop(&self) -> bool {
        let changed = {
            let mut state = self.state.lock();
            match *state {
                MonitorState::Idle | MonitorState::Running => {
                    *state = MonitorState::Stopping;
                    true
                }
                MonitorState::Stopping | MonitorState::Stopped => false,
            }
        };
        self.stop_tx.send_replace(true);
        changed
    }

    /// Copy of the current statistics.
    pub(crate) fn stats(&self) -> HostStats {
        self.stats_rx.borrow().clone()
    }

    pub(crate) fn state(&self) -> MonitorState {
        *self.state.lock()
    }

    /// Give up the handle, keeping a way to await the task's exit.
    pub(crate) fn into_exit(self) -> MonitorExit {
        MonitorExit {
            host: self.host,
            task: self.task,
        }
    }
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("host", &self.host)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Completion handle for a stopped monitor.
///
/// Dropping it is fine: the monitor has already been told to stop and will
/// exit on its own. Await [`stopped`](MonitorExit::stopped) to know when its
/// task has finished.
#[derive(Debug)]
pub struct MonitorExit {
    host: HostId,
    task: JoinHandle<()>,
}

impl MonitorExit {
    /// Host the stopped monitor was probing.
    pub fn host(&self) -> &HostId {
        &self.host
    }

    /// Check whether the task has already exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to exit.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::warn!(host = %self.host, "host monitor panicked");
            }
        }
    }

    pub(crate) fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }
}
