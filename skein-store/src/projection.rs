//! Read-model projections over the event log.

use crate::store::EventLogEntry;
use std::collections::HashMap;
use std::hash::Hash;

/// A pure fold from an ordered event sequence to aggregate read state.
///
/// Implementations must be total and side-effect free: identical input
/// sequences always yield identical output maps, independent of wall-clock
/// time or any randomness. The log is the source of truth; every projection
/// result is disposable and rebuildable.
pub trait Projection {
    /// Event type this projection folds.
    type Event;
    /// Aggregate identifier the read model is keyed by.
    type Id: Eq + Hash + Clone;
    /// Aggregate read state.
    type State;

    /// Seed state when this event creates a new aggregate, `None` otherwise.
    /// A repeated creation event for the same id replaces the prior state.
    fn seed(&self, event: &Self::Event) -> Option<(Self::Id, Self::State)>;

    /// Id of the existing aggregate a non-creation event addresses, `None`
    /// for events this projection does not track.
    fn target(&self, event: &Self::Event) -> Option<Self::Id>;

    /// Fold one event into the addressed aggregate's state.
    fn apply(&self, state: &mut Self::State, event: &Self::Event);
}

/// Fold log entries, in order, into a map of aggregate states.
///
/// Events addressing an unknown aggregate are a silent no-op: event logs may
/// be partial under partial-failure scenarios, and a projection must not
/// fail over them.
pub fn project<P: Projection>(
    projection: &P,
    entries: &[EventLogEntry<P::Event>],
) -> HashMap<P::Id, P::State> {
    let mut aggregates = HashMap::new();
    for entry in entries {
        if let Some((id, state)) = projection.seed(&entry.event) {
            aggregates.insert(id, state);
            continue;
        }
        if let Some(id) = projection.target(&entry.event) {
            if let Some(state) = aggregates.get_mut(&id) {
                projection.apply(state, &entry.event);
            }
        }
    }
    aggregates
}
