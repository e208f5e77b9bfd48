//! # pingwatch-types
//!
//! Core types for host reachability monitoring. This crate defines the data
//! shared between the pingwatch engine (which produces measurements) and any
//! consumer (a CLI, a dashboard, an exporter).
//!
//! ## Design Goals
//!
//! - **Pure data**: no threads, no runtime, no I/O. Every type here is owned
//!   and cloneable so a consumer can hold a copy without synchronising
//!   against the producer.
//! - **One key**: [`HostId`] is the normalized host string and the only
//!   uniqueness constraint on the monitored set.
//! - **Bounded memory**: [`History`] is a fixed-capacity FIFO ring.
//! - **Optional serialization**: enable the `serde` feature to serialize
//!   events and snapshots.
//!
//! ## Features
//!
//! - `serde`: JSON/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use pingwatch_types::{HostId, HostStats, HostStatus};
//!
//! let host = HostId::parse("https://Example.com/status").unwrap();
//! assert_eq!(host.as_str(), "example.com");
//!
//! let mut stats = HostStats::new(host);
//! stats.record_success(1_703_160_000_000, Some(12.5), "64 bytes from 93.184.216.34");
//! stats.record_failure(1_703_160_001_000, "Request timeout for icmp_seq 0");
//!
//! assert_eq!(stats.sent, 2);
//! assert_eq!(stats.received, 1);
//! assert_eq!(stats.status, HostStatus::Down);
//! assert_eq!(stats.uptime_percent(), 50.0);
//! ```

mod event;
mod history;
mod host;
mod probe;
mod snapshot;
mod stats;

pub use event::UpdateEvent;
pub use history::{History, HistoryEntry, DEFAULT_HISTORY_CAPACITY};
pub use host::{HostId, InvalidHost};
pub use probe::ProbeResult;
pub use snapshot::Snapshot;
pub use stats::{HostStats, HostStatus};

/// Get current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
