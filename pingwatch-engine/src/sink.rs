//! Bounded, drop-oldest event queue shared by all monitors.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pingwatch_types::{HostId, UpdateEvent};
use tokio::sync::Notify;

/// Events held before the oldest is dropped, unless configured otherwise.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Producer side. Monitors publish into it; the manager purges and closes it.
#[derive(Debug)]
pub(crate) struct EventSink {
    capacity: usize,
    queue: Mutex<VecDeque<UpdateEvent>>,
    dropped: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl EventSink {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Enqueue an event, evicting the oldest one if full.
    ///
    /// Never blocks. Returns `false` if the sink is closed.
    pub(crate) fn publish(&self, event: UpdateEvent) -> bool {
        {
            let mut queue = self.queue.lock();
            if self.closed.load(Ordering::Acquire) {
                return false;
            }
            if queue.len() >= self.capacity {
                queue.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
        true
    }

    /// Remove every queued event for `host`. Returns how many were removed.
    pub(crate) fn purge_host(&self, host: &HostId) -> usize {
        let mut queue = self.queue.lock();
        let before = queue.len();
        queue.retain(|event| &event.host != host);
        before - queue.len()
    }

    /// Stop accepting events and discard whatever is queued.
    pub(crate) fn close(&self) {
        {
            let mut queue = self.queue.lock();
            self.closed.store(true, Ordering::Release);
            queue.clear();
        }
        self.notify.notify_waiters();
    }

    fn pop(&self) -> Option<UpdateEvent> {
        self.queue.lock().pop_front()
    }
}

/// Consumer side of the update queue.
///
/// Cheap to clone; clones share the same queue, so each event is delivered
/// to exactly one of them. Events for one host come out in the order the
/// probes completed.
///
/// # Example
///
/// ```rust,no_run
/// # use pingwatch_engine::MonitorManager;
/// # async fn demo(manager: MonitorManager) {
/// let mut events = manager.events();
///
/// // Polling consumer, e.g. a UI tick
/// for event in events.drain() {
///     println!("{}: {}", event.host, event.stats.status);
/// }
///
/// // Async consumer
/// while let Some(event) = events.recv().await {
///     println!("{}: {}", event.host, event.stats.status);
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EventStream {
    sink: Arc<EventSink>,
}

impl EventStream {
    pub(crate) fn new(sink: Arc<EventSink>) -> Self {
        Self { sink }
    }

    /// Take the oldest queued event without waiting.
    pub fn try_recv(&self) -> Option<UpdateEvent> {
        self.sink.pop()
    }

    /// Take every queued event without waiting, oldest first.
    pub fn drain(&self) -> Vec<UpdateEvent> {
        self.sink.queue.lock().drain(..).collect()
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the manager has shut down.
    pub async fn recv(&mut self) -> Option<UpdateEvent> {
        loop {
            let notified = self.sink.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a publish or close in between
            // still wakes us.
            notified.as_mut().enable();

            if let Some(event) = self.sink.pop() {
                return Some(event);
            }
            if self.is_closed() {
                return None;
            }

            notified.await;
        }
    }

    /// Events currently queued.
    pub fn len(&self) -> usize {
        self.sink.queue.lock().len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum events held before the oldest is dropped.
    pub fn capacity(&self) -> usize {
        self.sink.capacity
    }

    /// Events evicted so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.sink.dropped.load(Ordering::Relaxed)
    }

    /// Check if the manager has shut down.
    pub fn is_closed(&self) -> bool {
        self.sink.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingwatch_types::HostStats;
    use std::time::Duration;

    fn event(host: &str, seq: u64) -> UpdateEvent {
        let mut stats = HostStats::new(HostId::parse(host).unwrap());
        stats.record_success(seq, Some(seq as f64), "ok");
        UpdateEvent::new(stats, seq)
    }

    fn stream(capacity: usize) -> (Arc<EventSink>, EventStream) {
        let sink = Arc::new(EventSink::new(capacity));
        (sink.clone(), EventStream::new(sink))
    }

    #[test]
    fn events_come_out_in_publish_order() {
        let (sink, events) = stream(10);
        for seq in 0..3 {
            assert!(sink.publish(event("a.example", seq)));
        }

        let seqs: Vec<u64> = events.drain().iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(seqs, [0, 1, 2]);
        assert!(events.is_empty());
    }

    #[test]
    fn full_queue_drops_oldest() {
        let (sink, events) = stream(3);
        for seq in 0..5 {
            sink.publish(event("a.example", seq));
        }

        assert_eq!(events.len(), 3);
        assert_eq!(events.dropped(), 2);
        assert_eq!(events.try_recv().unwrap().timestamp_ms, 2);
    }

    #[test]
    fn purge_removes_only_that_host() {
        let (sink, events) = stream(10);
        sink.publish(event("a.example", 1));
        sink.publish(event("b.example", 2));
        sink.publish(event("a.example", 3));

        let removed = sink.purge_host(&HostId::parse("a.example").unwrap());
        assert_eq!(removed, 2);

        let remaining = events.drain();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].host.as_str(), "b.example");
    }

    #[test]
    fn closed_sink_discards_and_rejects() {
        let (sink, events) = stream(10);
        sink.publish(event("a.example", 1));
        sink.close();

        assert!(events.is_closed());
        assert!(events.is_empty());
        assert!(!sink.publish(event("a.example", 2)));
        assert!(events.try_recv().is_none());
    }

    #[test]
    fn clones_share_the_queue() {
        let (sink, events) = stream(10);
        let other = events.clone();
        sink.publish(event("a.example", 1));

        assert!(other.try_recv().is_some());
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn recv_wakes_on_publish() {
        let (sink, mut events) = stream(10);

        let waiter = tokio::spawn(async move { events.recv().await });
        tokio::task::yield_now().await;
        sink.publish(event("a.example", 9));

        let got = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.unwrap().timestamp_ms, 9);
    }

    #[tokio::test]
    async fn recv_returns_none_after_close() {
        let (sink, mut events) = stream(10);

        let waiter = tokio::spawn(async move { events.recv().await });
        tokio::task::yield_now().await;
        sink.close();

        let got = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(got.is_none());
    }
}
