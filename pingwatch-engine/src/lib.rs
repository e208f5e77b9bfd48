//! # pingwatch-engine
//!
//! Concurrent host reachability monitoring.
//!
//! A [`MonitorManager`] owns one background task per monitored host. Each
//! task probes its host at a shared interval through a pluggable [`Prober`],
//! folds the result into that host's [`HostStats`], and publishes an
//! [`UpdateEvent`] to a single bounded queue drained by the consumer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pingwatch_engine::{MonitorManager, SystemPingProber};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = MonitorManager::builder()
//!         .prober(Arc::new(SystemPingProber::new()))
//!         .interval(Duration::from_secs(1))
//!         .build()?;
//!
//!     manager.add_host("https://example.com/health")?;
//!     manager.add_host("192.168.1.1")?;
//!
//!     let mut events = manager.events();
//!     while let Some(event) = events.recv().await {
//!         println!("{} {} {:?}", event.host, event.stats.status, event.stats.last_latency_ms);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - At most one monitor per normalized host.
//! - Probes for one host never overlap, and its events arrive in probe order.
//! - Once [`MonitorManager::remove_host`] returns, no further event for that
//!   host is delivered.
//! - A slow consumer never blocks probing: when the queue is full the oldest
//!   event is dropped.
//! - Interval changes apply to every monitor from its next iteration.

mod error;
mod manager;
mod monitor;
mod prober;
mod sink;
mod system;

use std::time::Duration;

pub use error::ManagerError;
pub use manager::{ManagerBuilder, MonitorManager};
pub use monitor::{MonitorExit, MonitorState};
pub use prober::{Prober, DEFAULT_PROBE_TIMEOUT};
pub use sink::{EventStream, DEFAULT_QUEUE_CAPACITY};
pub use system::{resolve_host, Platform, SystemPingProber};

// Re-export types for convenience
pub use pingwatch_types::{
    HistoryEntry, HostId, HostStats, HostStatus, InvalidHost, ProbeResult, Snapshot, UpdateEvent,
};

/// Smallest accepted probe interval, in seconds.
pub const MIN_INTERVAL_SECS: f64 = 0.2;

/// Probe interval used unless configured otherwise.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Convenience alias for manager operations.
pub type Result<T, E = ManagerError> = std::result::Result<T, E>;
