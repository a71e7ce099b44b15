//! # Skein Core
//!
//! Shared foundation for the Skein in-process message-broker kernel.
//!
//! This crate carries everything the broker and store crates have in common:
//!
//! - [`event`]: the [`Event`] trait binding a payload to its topic tag
//! - [`types`]: partition, sequence, consumer, and subscription identifiers
//! - [`error`]: error taxonomy and result alias
//! - [`config`]: broker and retry configuration with validation
//! - [`executor`]: task spawning with in-flight accounting
//! - [`telemetry`]: tracing bootstrap
//!
//! ## Quick Start
//!
//! ```rust
//! use skein_core::{BrokerConfig, Event};
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
//! let config = BrokerConfig::default().with_num_partitions(8);
//! config.validate().expect("valid configuration");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod prelude;
pub mod telemetry;
pub mod types;

pub use crate::{
    config::{BrokerConfig, RetryConfig},
    error::{Error, HandlerError, Result},
    event::Event,
    executor::{InFlightGuard, TaskExecutor},
    types::{ConsumerId, PartitionId, SequenceNumber, SubscriptionId, Timestamp},
};
