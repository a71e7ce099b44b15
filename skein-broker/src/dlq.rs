//! Dead-letter storage for deliveries that exhausted their retry budget.

use chrono::Utc;
use parking_lot::Mutex;
use skein_core::{ConsumerId, HandlerError, Timestamp};

/// An event that could not be delivered to one consumer.
///
/// Captured exactly once per (event, consumer) pair that exhausts its retry
/// budget or fails fatally; never silently dropped.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry<E> {
    /// The original event
    pub event: E,
    /// The consumer the delivery was destined for
    pub consumer: ConsumerId,
    /// Total delivery attempts made
    pub attempts: u32,
    /// The failure returned by the final attempt
    pub last_error: HandlerError,
    /// When the entry was recorded
    pub recorded_at: Timestamp,
}

/// Append-only store of dead-lettered deliveries.
///
/// Many delivery tasks may record concurrently; readers get snapshot copies.
/// This is the only place a publisher can observe delivery failure.
#[derive(Debug)]
pub struct DeadLetterQueue<E> {
    entries: Mutex<Vec<DeadLetterEntry<E>>>,
}

impl<E> DeadLetterQueue<E> {
    /// Create an empty dead-letter queue.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }

    /// Record a dead-lettered delivery.
    pub fn record(&self, entry: DeadLetterEntry<E>) {
        self.entries.lock().push(entry);
    }

    /// Record a delivery failure with the capture timestamp set to now.
    pub fn record_failure(
        &self,
        event: E,
        consumer: ConsumerId,
        attempts: u32,
        last_error: HandlerError,
    ) {
        self.record(DeadLetterEntry { event, consumer, attempts, last_error, recorded_at: Utc::now() });
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no delivery has been dead-lettered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<E: Clone> DeadLetterQueue<E> {
    /// Snapshot copy of all entries in recording order.
    #[must_use]
    pub fn entries(&self) -> Vec<DeadLetterEntry<E>> {
        self.entries.lock().clone()
    }
}

impl<E> Default for DeadLetterQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let dlq = DeadLetterQueue::new();
        assert!(dlq.is_empty());

        dlq.record_failure("evt", ConsumerId::new("billing"), 3, HandlerError::retryable("boom"));

        let entries = dlq.entries();
        assert_eq!(dlq.len(), 1);
        assert_eq!(entries[0].event, "evt");
        assert_eq!(entries[0].attempts, 3);
        assert_eq!(entries[0].consumer.as_str(), "billing");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let dlq = DeadLetterQueue::new();
        dlq.record_failure("evt", ConsumerId::new("c"), 1, HandlerError::fatal("bad"));

        let mut snapshot = dlq.entries();
        snapshot.clear();
        assert_eq!(dlq.len(), 1);
    }
}
