//! The probing capability consumed by host monitors.

use std::fmt::Debug;
use std::time::Duration;

use pingwatch_types::{HostId, ProbeResult};

/// Default time a single probe may take (1 second).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Performs one reachability/latency measurement for one host.
///
/// # Contract
///
/// - Completes or gives up within `timeout`. Monitors stop waiting at
///   `timeout` and record an overrun as a timeout failure.
/// - Never panics or errors on unreachable hosts, resolution failures or
///   timeouts: those are `ProbeResult { success: false, .. }` with a
///   descriptive message.
/// - Cancel-safe: a monitor may drop the future mid-probe on shutdown.
/// - Must not block the executor thread; blocking work belongs in
///   `tokio::task::spawn_blocking`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use pingwatch_engine::Prober;
/// use pingwatch_types::{HostId, ProbeResult};
///
/// #[derive(Debug)]
/// struct AlwaysUp;
///
/// #[async_trait::async_trait]
/// impl Prober for AlwaysUp {
///     async fn probe(&self, _host: &HostId, _timeout: Duration) -> ProbeResult {
///         ProbeResult::success(1.0, "stub reply")
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Prober: Send + Sync + Debug + 'static {
    /// Probe `host` once.
    async fn probe(&self, host: &HostId, timeout: Duration) -> ProbeResult;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}
