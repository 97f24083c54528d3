//! # gram-docs: realtime document collections
//!
//! A [`DocumentStore`] holds schemaless documents grouped in named
//! collections. Inserts are append-only; live queries receive the complete
//! ordered snapshot again after every change, never a diff.
//!
//! ```text
//! ┌──────────────────┐
//! │ CollectionWatch  │  ← typed records, cancellation, restart
//! ├──────────────────┤
//! │  DocumentStore   │  ← insert / subscribe / unsubscribe
//! └──────────────────┘
//! ```
//!
//! [`MemoryDocumentStore`] implements the same contract in-process, for tests
//! and local development.

mod error;
mod hub;
mod memory;
pub mod store;
mod types;
mod watch;

pub use error::{DocsError, DocsResult};
pub use hub::{SnapshotHub, SnapshotSender, SubscriptionId, Target};
pub use memory::MemoryDocumentStore;
pub use store::{DocumentStore, Subscription};
pub use types::{
    compare_values, format_timestamp, Direction, Document, DocumentId, DocumentWrite, OrderBy,
    Query, Snapshot, ID_FIELD,
};
pub use watch::{CollectionWatch, WatchEvent, WatchHandle};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CollectionWatch, Direction, DocsError, DocsResult, DocumentStore, DocumentWrite,
        MemoryDocumentStore, Query, WatchEvent,
    };
}
