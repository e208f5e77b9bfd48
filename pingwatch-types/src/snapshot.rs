//! Snapshot - a point-in-time view of every monitored host.

use std::collections::BTreeMap;

use crate::{current_timestamp_ms, HostId, HostStats, HostStatus};

/// A point-in-time copy of all hosts' statistics.
///
/// Polling consumers use this as an alternative to draining update events.
///
/// # Example
///
/// ```rust
/// use pingwatch_types::{HostId, HostStats, Snapshot};
///
/// let mut up = HostStats::new(HostId::parse("10.0.0.1").unwrap());
/// up.record_success(1, Some(5.0), "ok");
/// let mut down = HostStats::new(HostId::parse("10.0.0.2").unwrap());
/// down.record_failure(1, "lost");
///
/// let snapshot: Snapshot = [up, down].into_iter().collect();
/// assert_eq!(snapshot.len(), 2);
/// assert!(snapshot.any_down());
/// assert_eq!(snapshot.get("10.0.0.1").unwrap().received, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    /// Statistics for each host, keyed by host.
    pub hosts: BTreeMap<HostId, HostStats>,
}

impl Snapshot {
    /// Create an empty snapshot with the current timestamp.
    pub fn new() -> Self {
        Self::with_timestamp(current_timestamp_ms())
    }

    /// Create an empty snapshot with a specific timestamp.
    pub fn with_timestamp(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            hosts: BTreeMap::new(),
        }
    }

    /// Add or replace a host's statistics.
    pub fn insert(&mut self, stats: HostStats) {
        self.hosts.insert(stats.host.clone(), stats);
    }

    /// Check if the snapshot is empty (no hosts).
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Number of hosts in the snapshot.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Get statistics for a specific host.
    pub fn get(&self, host: &str) -> Option<&HostStats> {
        self.hosts.get(host)
    }

    /// Iterate over all hosts in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&HostId, &HostStats)> {
        self.hosts.iter()
    }

    /// The host identifiers present.
    pub fn host_ids(&self) -> impl Iterator<Item = &HostId> {
        self.hosts.keys()
    }

    /// Check whether any host's last probe failed.
    pub fn any_down(&self) -> bool {
        self.hosts.values().any(|s| s.status == HostStatus::Down)
    }

    /// Total probes sent across all hosts.
    pub fn total_sent(&self) -> u64 {
        self.hosts.values().map(|s| s.sent).sum()
    }

    /// Total replies received across all hosts.
    pub fn total_received(&self) -> u64 {
        self.hosts.values().map(|s| s.received).sum()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<HostStats> for Snapshot {
    fn from_iter<I: IntoIterator<Item = HostStats>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for stats in iter {
            snapshot.insert(stats);
        }
        snapshot
    }
}
