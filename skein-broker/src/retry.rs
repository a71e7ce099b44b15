//! Bounded retry for individual deliveries.

use crate::consumer::Consumer;
use crate::dlq::DeadLetterQueue;
use rand::Rng;
use skein_core::{Event, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Drives a single (event, consumer) delivery to completion.
///
/// Each delivery attempt either succeeds, schedules a retry after a jittered
/// exponential backoff, or, once the attempt budget is exhausted or the
/// failure is fatal, records exactly one dead-letter entry. Nothing ever
/// propagates back to the publisher: publish is fire-and-forget.
///
/// All retry state (attempt counter, backoff timer) is private to the
/// delivery task; coordinators are cheap to clone and share nothing.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    config: RetryConfig,
}

impl RetryCoordinator {
    /// Create a coordinator with the given retry configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Deliver one event to one consumer, retrying per configuration.
    ///
    /// Runs until the consumer succeeds or the delivery is dead-lettered;
    /// intended to be spawned as an independent task per (event, consumer)
    /// pair.
    pub async fn deliver<E: Event>(
        &self,
        event: E,
        consumer: Arc<dyn Consumer<E>>,
        dead_letters: Arc<DeadLetterQueue<E>>,
    ) {
        let topic = event.topic();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match consumer.handle(event.clone()).await {
                Ok(()) => {
                    trace!(?topic, consumer = %consumer.id(), attempt, "delivery succeeded");
                    return;
                }
                Err(error) => {
                    let exhausted = attempt >= self.config.max_attempts;
                    if exhausted || !error.is_retryable() {
                        warn!(
                            ?topic,
                            consumer = %consumer.id(),
                            attempts = attempt,
                            %error,
                            "delivery dead-lettered"
                        );
                        dead_letters.record_failure(event, consumer.id().clone(), attempt, error);
                        return;
                    }

                    let delay = self.jittered(self.config.backoff_for(attempt));
                    debug!(
                        ?topic,
                        consumer = %consumer.id(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "delivery failed, retry scheduled"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Scale a backoff delay by a random factor in `[1 - jitter, 1 + jitter)`.
    fn jittered(&self, base: Duration) -> Duration {
        if self.config.jitter <= 0.0 {
            return base;
        }
        let factor =
            rand::rng().random_range(1.0 - self.config.jitter..1.0 + self.config.jitter);
        base.mul_f64(factor)
    }
}
