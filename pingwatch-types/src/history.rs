//! Bounded per-host measurement history.

use std::collections::VecDeque;

/// Number of history points kept per host unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 120;

/// One recorded probe: when it completed and its latency, if any.
///
/// `latency_ms` is `None` for lost probes (and for replies whose output
/// carried no parseable round-trip time).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryEntry {
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Round-trip time in milliseconds.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub latency_ms: Option<f64>,
}

/// Fixed-capacity FIFO ring of [`HistoryEntry`] values, oldest first.
///
/// Pushing into a full history evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "StoredHistory")
)]
pub struct History {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

/// Serialized form, bounded on the way in.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct StoredHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

#[cfg(feature = "serde")]
impl From<StoredHistory> for History {
    fn from(stored: StoredHistory) -> Self {
        let capacity = stored.capacity.max(1);
        let mut entries = stored.entries;
        let excess = entries.len().saturating_sub(capacity);
        entries.drain(..excess);
        Self { capacity, entries }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history with [`DEFAULT_HISTORY_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an empty history holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an entry, evicting the oldest one if full.
    pub fn push(&mut self, timestamp_ms: u64, latency_ms: Option<f64>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            timestamp_ms,
            latency_ms,
        });
    }

    /// Maximum number of entries retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest retained entry.
    pub fn first(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Percentage of retained entries without a latency.
    ///
    /// Unlike [`HostStats::loss_percent`](crate::HostStats::loss_percent) this
    /// only covers the retained window. Returns 0 for an empty history.
    pub fn window_loss_percent(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let lost = self.entries.iter().filter(|e| e.latency_ms.is_none()).count();
        lost as f64 / self.entries.len() as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_history_is_empty() {
        let h = History::new();
        assert!(h.is_empty());
        assert_eq!(h.capacity(), DEFAULT_HISTORY_CAPACITY);
        assert!(h.first().is_none());
    }

    #[test]
    fn push_appends_in_order() {
        let mut h = History::with_capacity(4);
        h.push(1, Some(1.0));
        h.push(2, None);

        assert_eq!(h.len(), 2);
        assert_eq!(h.first().unwrap().timestamp_ms, 1);
        assert_eq!(h.last().unwrap().latency_ms, None);
    }

    #[test]
    fn history_caps_at_capacity() {
        let mut h = History::new();
        for i in 0..200 {
            h.push(i, Some(i as f64));
        }

        assert_eq!(h.len(), DEFAULT_HISTORY_CAPACITY);
        // The 80 oldest entries were evicted first
        assert_eq!(h.first().unwrap().timestamp_ms, 80);
        assert_eq!(h.last().unwrap().timestamp_ms, 199);
    }

    #[test]
    fn first_retained_timestamp_advances_after_capacity() {
        let mut h = History::with_capacity(120);
        let mut previous_first = None;

        for i in 0..300u64 {
            h.push(1_000 + i, None);
            assert!(h.len() <= 120);

            let first = h.first().unwrap().timestamp_ms;
            if let Some(prev) = previous_first {
                assert!(first >= prev);
                if i >= 120 {
                    assert_eq!(first, prev + 1);
                }
            }
            previous_first = Some(first);
        }
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut h = History::with_capacity(0);
        h.push(1, None);
        h.push(2, None);
        assert_eq!(h.capacity(), 1);
        assert_eq!(h.len(), 1);
        assert_eq!(h.first().unwrap().timestamp_ms, 2);
    }

    #[test]
    fn window_loss_counts_missing_latencies() {
        let mut h = History::with_capacity(4);
        assert_eq!(h.window_loss_percent(), 0.0);

        h.push(1, Some(1.0));
        h.push(2, None);
        h.push(3, Some(2.0));
        h.push(4, None);
        assert_eq!(h.window_loss_percent(), 50.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let mut h = History::with_capacity(3);
        h.push(10, Some(4.5));
        h.push(11, None);

        let json = serde_json::to_string(&h).unwrap();
        let parsed: History = serde_json::from_str(&json).unwrap();
        assert_eq!(h, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_restores_the_bound() {
        let json = r#"{"capacity":2,"entries":[
            {"timestamp_ms":1},{"timestamp_ms":2,"latency_ms":3.0},{"timestamp_ms":3}
        ]}"#;
        let mut h: History = serde_json::from_str(json).unwrap();
        assert_eq!(h.capacity(), 2);
        assert_eq!(h.len(), 2);
        assert_eq!(h.first().unwrap().timestamp_ms, 2);

        h.push(4, None);
        assert_eq!(h.len(), 2);
        assert_eq!(h.first().unwrap().timestamp_ms, 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_raises_zero_capacity() {
        let json = r#"{"capacity":0,"entries":[{"timestamp_ms":1},{"timestamp_ms":2}]}"#;
        let mut h: History = serde_json::from_str(json).unwrap();
        assert_eq!(h.capacity(), 1);
        assert_eq!(h.len(), 1);
        assert_eq!(h.last().unwrap().timestamp_ms, 2);

        h.push(3, None);
        assert_eq!(h.len(), 1);
    }
}
