//! Duplicate suppression for consumers.

use crate::consumer::Consumer;
use async_trait::async_trait;
use parking_lot::Mutex;
use skein_core::{ConsumerId, Event, HandlerError};
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

/// Wraps a consumer with a processed-key set so duplicate events are
/// acknowledged without reaching the inner handler.
///
/// Event identity is domain-defined: the `key_of` closure extracts it (an
/// embedded order id, for example). A duplicate key short-circuits to
/// success; the broker sees an ordinary acknowledgement. If the inner
/// handler fails, the key is released again so the retry path can
/// reprocess the event. Only a completed delivery marks its key as done.
pub struct Idempotent<C, F> {
    inner: C,
    key_of: F,
    seen: Mutex<HashSet<String>>,
}

impl<C, F> Idempotent<C, F> {
    /// Wrap `inner`, extracting per-event identity with `key_of`.
    pub fn new(inner: C, key_of: F) -> Self {
        Self { inner, key_of, seen: Mutex::new(HashSet::new()) }
    }

    /// Number of distinct keys processed so far.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl<E, C, F> Consumer<E> for Idempotent<C, F>
where
    E: Event,
    C: Consumer<E>,
    F: Fn(&E) -> String + Send + Sync,
{
    fn id(&self) -> &ConsumerId {
        self.inner.id()
    }

    async fn handle(&self, event: E) -> Result<(), HandlerError> {
        let key = (self.key_of)(&event);
        if !self.seen.lock().insert(key.clone()) {
            trace!(consumer = %self.inner.id(), key, "duplicate event skipped");
            return Ok(());
        }
        match self.inner.handle(event).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.seen.lock().remove(&key);
                Err(error)
            }
        }
    }
}

impl<C: fmt::Debug, F> fmt::Debug for Idempotent<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Idempotent").field("inner", &self.inner).finish_non_exhaustive()
    }
}
