use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{DocsResult, DocumentId, DocumentWrite, Query, Snapshot, SubscriptionId};

/// Realtime document collections.
///
/// - `insert` → append one document, return its assigned id
/// - `subscribe` → push the full ordered snapshot now and after every change
/// - `unsubscribe` → stop pushing to one subscriber
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a document. Fails without side effects.
    async fn insert(&self, collection: &str, write: DocumentWrite) -> DocsResult<DocumentId>;

    /// Open a live query.
    ///
    /// The current snapshot is queued before this returns. A store-side
    /// failure arrives as one `Err` on `updates`, after which the channel
    /// closes.
    async fn subscribe(&self, query: Query) -> DocsResult<Subscription>;

    /// Stop deliveries to a subscriber. Returns false for unknown ids.
    async fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Receiving half of a live query
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub query: Query,
    pub updates: mpsc::UnboundedReceiver<DocsResult<Snapshot>>,
}
