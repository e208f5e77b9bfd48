//! Error types for the monitor manager.

use pingwatch_types::InvalidHost;
use thiserror::Error;

/// Errors returned synchronously by [`MonitorManager`](crate::MonitorManager)
/// operations.
///
/// Probe failures never show up here: they are recorded as failed
/// measurements on the host they belong to.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Host input was empty or could not be parsed.
    #[error(transparent)]
    InvalidHost(#[from] InvalidHost),

    /// No monitor exists for this host.
    #[error("host not monitored: {0}")]
    NotFound(String),

    /// Probe interval below the floor (or not a finite number).
    #[error("invalid probe interval {0}s: must be at least {min}s", min = crate::MIN_INTERVAL_SECS)]
    InvalidInterval(f64),

    /// Probe timeout of zero.
    #[error("probe timeout must be greater than zero")]
    InvalidTimeout,

    /// Built outside a tokio runtime and no runtime handle was given.
    #[error("no tokio runtime available to spawn host monitors")]
    NoRuntime,

    /// The manager has been shut down.
    #[error("monitor manager has been shut down")]
    ShutDown,
}
