//! Outcome of a single reachability probe.

use std::time::Duration;

/// Result of one probe against one host.
///
/// Unreachable hosts, resolution failures and timeouts are all ordinary
/// results with `success: false`; a probe never reports them as errors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbeResult {
    /// Whether the host replied.
    pub success: bool,
    /// Round-trip time in milliseconds, when the reply carried one.
    pub latency_ms: Option<f64>,
    /// Human-readable result or error text.
    pub message: String,
}

impl ProbeResult {
    /// A reply with a measured round-trip time.
    pub fn success(latency_ms: f64, message: impl Into<String>) -> Self {
        Self {
            success: true,
            latency_ms: Some(latency_ms),
            message: message.into(),
        }
    }

    /// A reply whose round-trip time could not be determined.
    pub fn reply_without_latency(message: impl Into<String>) -> Self {
        Self {
            success: true,
            latency_ms: None,
            message: message.into(),
        }
    }

    /// No reply.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            latency_ms: None,
            message: message.into(),
        }
    }

    /// No reply within `timeout`.
    pub fn timeout(timeout: Duration) -> Self {
        Self::failure(format!("timed out after {}ms", timeout.as_millis()))
    }

    /// Check whether this is a failure produced by [`ProbeResult::timeout`].
    pub fn is_timeout(&self) -> bool {
        !self.success && self.message.starts_with("timed out after ")
    }
}
