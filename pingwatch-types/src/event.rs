//! Update events published for each completed probe.

use crate::{HostId, HostStats};

/// Immutable notification that a host's statistics changed.
///
/// Carries a full copy of the statistics, never a reference into the
/// producer's state, so a consumer can keep or inspect it freely.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateEvent {
    /// Host the probe ran against.
    pub host: HostId,
    /// Statistics right after the probe was recorded.
    pub stats: HostStats,
    /// Unix timestamp in milliseconds when the probe was recorded.
    pub timestamp_ms: u64,
}

impl UpdateEvent {
    /// Create an event for a freshly recorded probe.
    pub fn new(stats: HostStats, timestamp_ms: u64) -> Self {
        Self {
            host: stats.host.clone(),
            stats,
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_copies_host_from_stats() {
        let mut stats = HostStats::new(HostId::parse("example.com").unwrap());
        stats.record_failure(42, "lost");

        let event = UpdateEvent::new(stats.clone(), 42);

        // Mutating the producer's copy afterwards does not touch the event
        stats.record_failure(43, "lost again");
        assert_eq!(event.host.as_str(), "example.com");
        assert_eq!(event.stats.sent, 1);
        assert_eq!(event.timestamp_ms, 42);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn event_serializes_status_lowercase() {
        let mut stats = HostStats::new(HostId::parse("10.0.0.1").unwrap());
        stats.record_success(7, Some(1.5), "ok");

        let json = serde_json::to_value(UpdateEvent::new(stats, 7)).unwrap();
        assert_eq!(json["host"], "10.0.0.1");
        assert_eq!(json["stats"]["status"], "up");
        assert_eq!(json["stats"]["history"]["entries"][0]["latency_ms"], 1.5);
    }
}
