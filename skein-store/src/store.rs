//! The append-only event log.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use skein_core::{SequenceNumber, Timestamp};
use tracing::trace;

/// A sequence number plus an event, as stored in the log.
///
/// Immutable once appended; the store never reorders or deletes entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry<E> {
    /// Position in the log, strictly increasing from 0 with no gaps
    pub sequence: SequenceNumber,
    /// The appended event
    pub event: E,
    /// When the entry was appended
    pub appended_at: Timestamp,
}

/// Append-only, in-memory event log.
///
/// Many writers may append concurrently; readers get snapshot copies, so a
/// replay is never affected by appends happening alongside it. The store
/// never rejects a well-formed event and never compacts.
#[derive(Debug)]
pub struct EventStore<E> {
    entries: RwLock<Vec<EventLogEntry<E>>>,
}

impl<E> EventStore<E> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: RwLock::new(Vec::new()) }
    }

    /// Append an event, returning its assigned sequence number.
    ///
    /// Sequence numbers start at 0 and are gap-free. O(1) amortized.
    pub fn append(&self, event: E) -> SequenceNumber {
        let mut entries = self.entries.write();
        let sequence = SequenceNumber::new(entries.len() as u64);
        entries.push(EventLogEntry { sequence, event, appended_at: Utc::now() });
        trace!(%sequence, "event appended");
        sequence
    }

    /// Number of entries in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Sequence number of the most recent entry, if any.
    #[must_use]
    pub fn last_sequence(&self) -> Option<SequenceNumber> {
        self.entries.read().last().map(|entry| entry.sequence)
    }
}

impl<E: Clone> EventStore<E> {
    /// Snapshot copy of all entries in sequence order.
    ///
    /// Mutating the returned vector does not affect the store.
    #[must_use]
    pub fn entries(&self) -> Vec<EventLogEntry<E>> {
        self.entries.read().clone()
    }

    /// Invoke `handler` once per stored entry, in sequence order.
    ///
    /// Synchronous with respect to the caller and restartable: independent
    /// replays over an unmodified store produce identical invocation
    /// sequences. Iterates a snapshot taken at call time, so the handler may
    /// itself append without deadlocking; such entries are outside this
    /// replay's view.
    pub fn replay<F>(&self, mut handler: F)
    where
        F: FnMut(EventLogEntry<E>),
    {
        for entry in self.entries() {
            handler(entry);
        }
    }
}

impl<E> Default for EventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_are_gap_free_from_zero() {
        let store = EventStore::new();
        assert_eq!(store.append("a"), SequenceNumber::new(0));
        assert_eq!(store.append("b"), SequenceNumber::new(1));
        assert_eq!(store.append("c"), SequenceNumber::new(2));
        assert_eq!(store.last_sequence(), Some(SequenceNumber::new(2)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_snapshot_is_detached_from_store() {
        let store = EventStore::new();
        store.append("a");

        let mut snapshot = store.entries();
        snapshot.clear();

        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].event, "a");
    }

    #[test]
    fn test_replay_visits_entries_in_sequence_order() {
        let store = EventStore::new();
        for event in ["a", "b", "c"] {
            store.append(event);
        }

        let mut first = Vec::new();
        store.replay(|entry| first.push((entry.sequence, entry.event)));
        let mut second = Vec::new();
        store.replay(|entry| second.push((entry.sequence, entry.event)));

        assert_eq!(
            first,
            vec![
                (SequenceNumber::new(0), "a"),
                (SequenceNumber::new(1), "b"),
                (SequenceNumber::new(2), "c"),
            ]
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_handler_may_append_during_replay() {
        let store = EventStore::new();
        store.append("a");

        let mut visited = 0;
        store.replay(|_| {
            store.append("echo");
            visited += 1;
        });

        // The replay saw only the snapshot; the echo landed after it.
        assert_eq!(visited, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_appends_assign_unique_sequences() {
        let store = std::sync::Arc::new(EventStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = std::sync::Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                (0..100).map(|n| store.append(n)).collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<SequenceNumber> =
            handles.into_iter().flat_map(|h| h.join().expect("writer thread")).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
        assert_eq!(store.len(), 800);
    }
}
