//! The consumer side of the publish/subscribe contract.

use async_trait::async_trait;
use skein_core::{ConsumerId, Event, HandlerError};
use std::fmt;
use std::marker::PhantomData;

/// A subscriber callback bound to a topic via [`Broker::subscribe`].
///
/// Handlers are invoked once per delivery attempt and may fail; failures are
/// classified by the returned [`HandlerError`] and contained entirely within
/// the broker's retry path. Handlers may publish further events on the same
/// broker (service chaining); the broker never holds internal locks while a
/// handler runs.
///
/// [`Broker::subscribe`]: crate::Broker::subscribe
#[async_trait]
pub trait Consumer<E: Event>: Send + Sync {
    /// Stable identifier for this consumer, recorded in dead-letter entries
    /// and delivery traces.
    fn id(&self) -> &ConsumerId;

    /// Handle one delivery attempt of an event.
    async fn handle(&self, event: E) -> Result<(), HandlerError>;
}

/// Consumer built from a synchronous closure.
///
/// Convenient for terminal consumers (recording, notification) that do not
/// need to await anything. Chaining services that republish should implement
/// [`Consumer`] directly.
pub struct FnConsumer<E, F> {
    id: ConsumerId,
    handler: F,
    _marker: PhantomData<fn(E)>,
}

impl<E, F> FnConsumer<E, F>
where
    E: Event,
    F: Fn(E) -> Result<(), HandlerError> + Send + Sync,
{
    /// Wrap a closure as a consumer with the given identifier.
    pub fn new(id: impl Into<String>, handler: F) -> Self {
        Self { id: ConsumerId::new(id), handler, _marker: PhantomData }
    }
}

#[async_trait]
impl<E, F> Consumer<E> for FnConsumer<E, F>
where
    E: Event,
    F: Fn(E) -> Result<(), HandlerError> + Send + Sync,
{
    fn id(&self) -> &ConsumerId {
        &self.id
    }

    async fn handle(&self, event: E) -> Result<(), HandlerError> {
        (self.handler)(event)
    }
}

impl<E, F> fmt::Debug for FnConsumer<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConsumer").field("id", &self.id).finish_non_exhaustive()
    }
}
