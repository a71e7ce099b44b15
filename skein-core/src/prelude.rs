//! Common imports for convenient usage of the Skein kernel.

pub use crate::config::{BrokerConfig, RetryConfig};
pub use crate::error::{Error, HandlerError, Result};
pub use crate::event::Event;
pub use crate::executor::TaskExecutor;
pub use crate::types::{ConsumerId, PartitionId, SequenceNumber, SubscriptionId, Timestamp};
