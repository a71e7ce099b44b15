//! # Skein Store
//!
//! Append-only event log and read-model projections for the Skein kernel.
//!
//! The [`EventStore`] is the source of truth: an immutable, gap-free,
//! sequence-numbered log that never reorders, deletes, or compacts entries.
//! All read-side state is disposable: a [`Projection`] folds the log into
//! current aggregate state on demand, any number of times, with identical
//! results.
//!
//! ## Examples
//!
//! ```rust
//! use skein_store::EventStore;
//!
//! let store = EventStore::new();
//! let first = store.append("created");
//! let second = store.append("updated");
//! assert!(first < second);
//!
//! let mut replayed = Vec::new();
//! store.replay(|entry| replayed.push(entry.event));
//! assert_eq!(replayed, vec!["created", "updated"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod projection;
pub mod store;

pub use projection::{project, Projection};
pub use store::{EventLogEntry, EventStore};
pub use skein_core::{Error, Result, SequenceNumber};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::{project, EventLogEntry, EventStore, Projection};
    pub use skein_core::prelude::*;
}
