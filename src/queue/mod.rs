//! Shared queue of events awaiting persistence
//!
//! The queue is the only state shared between the network side and the
//! writer pool. It is unbounded on purpose: ingestion applies no
//! backpressure, so a store outage grows the queue (and process memory)
//! until writes drain it again. Operators should watch the depth reported
//! in the logs.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::types::Event;

/// A queued event together with the number of failed persistence attempts.
#[derive(Debug, Clone)]
pub struct Pending {
    /// The event itself. Its identity never changes across retries.
    pub event: Event,
    /// How many store attempts have failed so far.
    pub attempts: u32,
}

impl Pending {
    fn first_attempt(event: Event) -> Self {
        Self { event, attempts: 0 }
    }
}

/// Unbounded multi-producer/multi-consumer queue of pending events.
///
/// `push` and `pop` never block. Insertion order is preserved for first
/// attempts; a requeued event is appended at the tail, so retries can be
/// reordered arbitrarily relative to fresh arrivals.
pub struct EventQueue {
    entries: Mutex<VecDeque<Pending>>,
    available: Notify,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    /// Append a freshly parsed event at the tail.
    pub fn push(&self, event: Event) {
        self.entries.lock().push_back(Pending::first_attempt(event));
        self.available.notify_one();
    }

    /// Return a failed event to the tail for a later retry, counting the
    /// failed attempt.
    pub fn requeue(&self, mut pending: Pending) {
        pending.attempts += 1;
        self.entries.lock().push_back(pending);
        self.available.notify_one();
    }

    /// Remove and return the head entry, or `None` when the queue is empty.
    pub fn pop(&self) -> Option<Pending> {
        self.entries.lock().pop_front()
    }

    /// Wait until work may be available, for at most `idle_backoff`.
    ///
    /// A push wakes at most one waiting consumer; a notification that slips
    /// past every waiter only delays a consumer by one backoff interval,
    /// since each one re-checks the queue when the timeout elapses.
    pub async fn wait_for_work(&self, idle_backoff: Duration) {
        let _ = tokio::time::timeout(idle_backoff, self.available.notified()).await;
    }

    /// Number of events currently awaiting persistence.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the queue currently holds no events.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_pop_on_empty_queue_is_none() {
        let queue = EventQueue::new();

        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_first_attempts_are_fifo() {
        let queue = EventQueue::new();
        let first = Event::plain("first");
        let second = Event::plain("second");

        queue.push(first.clone());
        queue.push(second.clone());

        assert_eq!(queue.pop().unwrap().event.id, first.id);
        assert_eq!(queue.pop().unwrap().event.id, second.id);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_requeue_appends_at_tail_and_counts_attempt() {
        let queue = EventQueue::new();
        queue.push(Event::plain("failing"));
        queue.push(Event::plain("fresh"));

        let failing = queue.pop().unwrap();
        assert_eq!(failing.attempts, 0);
        queue.requeue(failing);

        // The fresh arrival is served before the retry.
        assert_eq!(queue.pop().unwrap().event.message.as_deref(), Some("fresh"));
        let retried = queue.pop().unwrap();
        assert_eq!(retried.event.message.as_deref(), Some("failing"));
        assert_eq!(retried.attempts, 1);
    }

    #[test]
    fn test_identity_is_stable_across_requeues() {
        let queue = EventQueue::new();
        let event = Event::plain("poison");
        let id = event.id;
        queue.push(event);

        for _ in 0..5 {
            let pending = queue.pop().unwrap();
            assert_eq!(pending.event.id, id);
            queue.requeue(pending);
        }

        assert_eq!(queue.pop().unwrap().attempts, 5);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let queue = Arc::new(EventQueue::new());
        let mut producers = Vec::new();

        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            producers.push(thread::spawn(move || {
                for i in 0..100 {
                    queue.push(Event::plain(format!("event {}", i)));
                }
            }));
        }
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(queue.len(), 400);
    }

    #[tokio::test]
    async fn test_wait_for_work_returns_early_on_push() {
        let queue = Arc::new(EventQueue::new());

        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue.wait_for_work(Duration::from_secs(30)).await;
            })
        };

        // Give the waiter a moment to park, then wake it with work.
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(Event::plain("wake up"));

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter should wake well before its 30s timeout")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_work_times_out_when_idle() {
        let queue = EventQueue::new();
        let started = std::time::Instant::now();

        queue.wait_for_work(Duration::from_millis(50)).await;

        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
