//! Aggregate measurement state for one host.

use std::fmt;

use crate::{History, HostId, ProbeResult};

/// Reachability status derived from the most recent probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HostStatus {
    /// No probe has completed yet.
    #[default]
    Unknown,
    /// The last probe got a reply.
    Up,
    /// The last probe got no reply.
    Down,
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostStatus::Unknown => write!(f, "unknown"),
            HostStatus::Up => write!(f, "up"),
            HostStatus::Down => write!(f, "down"),
        }
    }
}

/// Counters, latency aggregates and rolling history for one host.
///
/// Each `record_*` call updates every field it touches in one `&mut self`
/// borrow, so a copy taken between calls never shows `sent` bumped without
/// the matching history entry.
///
/// # Example
///
/// ```rust
/// use pingwatch_types::{HostId, HostStats};
///
/// let mut stats = HostStats::new(HostId::parse("10.0.0.1").unwrap());
/// for (i, latency) in [10.0, 20.0, 30.0].into_iter().enumerate() {
///     stats.record_success(i as u64, Some(latency), "reply");
/// }
///
/// assert_eq!(stats.min_latency_ms, Some(10.0));
/// assert_eq!(stats.max_latency_ms, Some(30.0));
/// assert_eq!(stats.avg_latency_ms, Some(20.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostStats {
    /// Host these statistics belong to.
    pub host: HostId,
    /// Probes completed.
    pub sent: u64,
    /// Probes that got a reply. Never exceeds `sent`.
    pub received: u64,
    /// Latency of the most recent probe; cleared by a failure.
    pub last_latency_ms: Option<f64>,
    /// Lowest latency seen.
    pub min_latency_ms: Option<f64>,
    /// Highest latency seen.
    pub max_latency_ms: Option<f64>,
    /// Running mean over every reply that carried a latency.
    pub avg_latency_ms: Option<f64>,
    /// Number of latencies folded into `avg_latency_ms`.
    pub latency_samples: u64,
    /// Status after the most recent probe.
    pub status: HostStatus,
    /// Result or error text of the most recent probe.
    pub last_message: String,
    /// Unix milliseconds of the first reply.
    pub first_seen_ms: Option<u64>,
    /// Unix milliseconds of the most recent reply.
    pub last_seen_ms: Option<u64>,
    /// Rolling per-probe history, oldest first.
    pub history: History,
}

impl HostStats {
    /// Empty statistics with the default history capacity.
    pub fn new(host: HostId) -> Self {
        Self::with_history(host, History::new())
    }

    /// Empty statistics keeping up to `capacity` history entries.
    pub fn with_history_capacity(host: HostId, capacity: usize) -> Self {
        Self::with_history(host, History::with_capacity(capacity))
    }

    fn with_history(host: HostId, history: History) -> Self {
        Self {
            host,
            sent: 0,
            received: 0,
            last_latency_ms: None,
            min_latency_ms: None,
            max_latency_ms: None,
            avg_latency_ms: None,
            latency_samples: 0,
            status: HostStatus::Unknown,
            last_message: String::new(),
            first_seen_ms: None,
            last_seen_ms: None,
            history,
        }
    }

    /// Fold one probe result in.
    pub fn record(&mut self, timestamp_ms: u64, result: &ProbeResult) {
        if result.success {
            self.record_success(timestamp_ms, result.latency_ms, result.message.clone());
        } else {
            self.record_failure(timestamp_ms, result.message.clone());
        }
    }

    /// Record a reply.
    ///
    /// A missing or non-finite latency still counts as received but leaves
    /// the latency aggregates untouched.
    pub fn record_success(
        &mut self,
        timestamp_ms: u64,
        latency_ms: Option<f64>,
        message: impl Into<String>,
    ) {
        let latency_ms = latency_ms.filter(|l| l.is_finite());

        self.sent += 1;
        self.received += 1;
        self.status = HostStatus::Up;
        self.last_message = message.into();
        self.last_latency_ms = latency_ms;
        self.last_seen_ms = Some(timestamp_ms);
        self.first_seen_ms.get_or_insert(timestamp_ms);

        if let Some(latency) = latency_ms {
            self.min_latency_ms = Some(self.min_latency_ms.map_or(latency, |m| m.min(latency)));
            self.max_latency_ms = Some(self.max_latency_ms.map_or(latency, |m| m.max(latency)));

            // Incremental mean: history is bounded, so recomputing from it
            // would only average the retained window.
            self.latency_samples += 1;
            let avg = self.avg_latency_ms.unwrap_or(0.0);
            self.avg_latency_ms = Some(avg + (latency - avg) / self.latency_samples as f64);
        }

        self.history.push(timestamp_ms, latency_ms);
    }

    /// Record a probe that got no reply.
    pub fn record_failure(&mut self, timestamp_ms: u64, message: impl Into<String>) {
        self.sent += 1;
        self.status = HostStatus::Down;
        self.last_message = message.into();
        self.last_latency_ms = None;
        self.history.push(timestamp_ms, None);
    }

    /// Probes without a reply.
    pub fn lost(&self) -> u64 {
        self.sent - self.received
    }

    /// `received / sent * 100`, or 0 before the first probe.
    pub fn uptime_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        self.received as f64 / self.sent as f64 * 100.0
    }

    /// `(sent - received) / sent * 100`, or 0 before the first probe.
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        self.lost() as f64 / self.sent as f64 * 100.0
    }
}
