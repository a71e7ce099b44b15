//! The event model shared by producers, consumers, and the store.

use std::fmt;
use std::hash::Hash;

/// An immutable fact published through the broker.
///
/// Applications define a closed enum of events per deployment and point the
/// associated [`Event::Topic`] type at a matching discriminant enum, so topic
/// dispatch is exhaustive and checked at compile time rather than switched on
/// strings at runtime.
///
/// Events are created once by a producer and never mutated; the broker clones
/// them freely when fanning out to multiple consumers. Identity for
/// idempotence purposes is domain-defined (an embedded order id, for
/// example), not assigned by the broker.
///
/// ```rust
/// use skein_core::Event;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum OrderTopic {
///     Placed,
///     Shipped,
/// }
///
/// #[derive(Debug, Clone)]
/// enum OrderEvent {
///     Placed { id: String, total: f64 },
///     Shipped { id: String },
/// }
///
/// impl Event for OrderEvent {
///     type Topic = OrderTopic;
///
///     fn topic(&self) -> OrderTopic {
///         match self {
///             Self::Placed { .. } => OrderTopic::Placed,
///             Self::Shipped { .. } => OrderTopic::Shipped,
///         }
///     }
/// }
/// ```
pub trait Event: Clone + Send + Sync + fmt::Debug + 'static {
    /// Topic discriminant for this event family. A closed, copyable enum in
    /// applications; used as the key of the broker's topic registry.
    type Topic: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// The topic this event belongs to.
    fn topic(&self) -> Self::Topic;
}
