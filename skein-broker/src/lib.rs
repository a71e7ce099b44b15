//! # Skein Broker
//!
//! In-process message broker kernel: topic-based publish/subscribe with
//! hash-partitioned per-key ordering, bounded retry, and dead-lettering.
//!
//! This crate provides:
//! - Topic registry with lazily created per-partition FIFO queues
//! - Catch-up delivery of backlog to late subscribers
//! - Per-(event, consumer) bounded retry with exponential backoff and jitter
//! - A dead-letter queue for deliveries that exhaust their budget
//! - An idempotent-consumer adapter for duplicate suppression
//!
//! ## Guarantees
//! - Events published with the same partition key are observed by every
//!   consumer of the topic in publish order
//! - Consumer failures never reach the publisher; they end in retries or in
//!   exactly one dead-letter entry per (event, consumer) pair
//!
//! ## Examples
//!
//! ```rust
//! use skein_broker::{Broker, FnConsumer};
//! use skein_core::{BrokerConfig, Event};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone)]
//! struct Ping;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Topic {
//!     Ping,
//! }
//!
//! impl Event for Ping {
//!     type Topic = Topic;
//!
//!     fn topic(&self) -> Topic {
//!         Topic::Ping
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let broker = Broker::new(BrokerConfig::default())?;
//! broker.subscribe(Topic::Ping, Arc::new(FnConsumer::new("ping", |_: Ping| Ok(())))).await;
//! broker.publish(Ping, "key-1").await;
//! broker.quiesce().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod broker;
pub mod consumer;
pub mod dlq;
pub mod idempotent;
pub mod retry;
pub mod routing;

pub use broker::{Broker, BrokerStats, SubscriptionHandle};
pub use consumer::{Consumer, FnConsumer};
pub use dlq::{DeadLetterEntry, DeadLetterQueue};
pub use idempotent::Idempotent;
pub use retry::RetryCoordinator;
pub use routing::PartitionRouter;
pub use skein_core::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::{Broker, Consumer, DeadLetterEntry, FnConsumer, Idempotent};
    pub use skein_core::prelude::*;
}
