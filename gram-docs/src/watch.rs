use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Direction, DocsError, DocsResult, DocumentStore, Query, Snapshot};

/// What a watch delivers
#[derive(Debug, Clone)]
pub enum WatchEvent<R> {
    /// Full ordered view of the collection after a change
    Snapshot(Arc<[R]>),
    /// The subscription is gone. Nothing follows; open a new watch.
    Failed(DocsError),
}

enum State<R> {
    Idle,
    Running {
        events: mpsc::UnboundedReceiver<WatchEvent<R>>,
    },
    Closed,
}

/// Cancels a watch from anywhere. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    cancel: CancellationToken,
}

impl WatchHandle {
    /// Stop the watch. No snapshot is delivered after this returns.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A live, typed view over one document collection.
///
/// The store subscription is opened lazily on the first [`next`](Self::next)
/// and is owned by a background task that stops on cancellation. Every
/// store push is mapped into records (`id` plus all stored fields) and
/// delivered as one immutable sequence.
///
/// ```rust
/// use std::sync::Arc;
/// use gram_docs::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> DocsResult<()> {
/// #[derive(serde::Deserialize)]
/// struct Row { id: String, n: u32 }
///
/// let store = Arc::new(MemoryDocumentStore::new());
/// let mut watch = CollectionWatch::<Row>::newest_first(store.clone(), "rows", "n");
///
/// store.insert("rows", DocumentWrite::new().set("n", 1)).await?;
/// if let Some(WatchEvent::Snapshot(rows)) = watch.next().await {
///     assert_eq!(rows.len(), 1);
/// }
/// watch.unsubscribe();
/// # Ok(())
/// # }
/// ```
pub struct CollectionWatch<R> {
    store: Arc<dyn DocumentStore>,
    query: Query,
    cancel: CancellationToken,
    state: State<R>,
}

impl<R> CollectionWatch<R>
where
    R: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(store: Arc<dyn DocumentStore>, query: Query) -> Self {
        Self {
            store,
            query,
            cancel: CancellationToken::new(),
            state: State::Idle,
        }
    }

    /// Watch `collection` ordered by `field`, newest first.
    pub fn newest_first<C, F>(store: Arc<dyn DocumentStore>, collection: C, field: F) -> Self
    where
        C: Into<String>,
        F: Into<String>,
    {
        Self::new(store, Query::collection(collection).order_by(field, Direction::Descending))
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn handle(&self) -> WatchHandle {
        WatchHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Open or still running, and not unsubscribed
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !matches!(self.state, State::Closed)
    }

    /// Wait for the next delivery.
    ///
    /// Returns `None` once the watch is unsubscribed, or after a
    /// [`WatchEvent::Failed`] has been handed out.
    pub async fn next(&mut self) -> Option<WatchEvent<R>> {
        if self.cancel.is_cancelled() {
            self.state = State::Closed;
            return None;
        }
        if matches!(self.state, State::Idle) {
            self.start();
        }

        let delivered = match &mut self.state {
            State::Running { events } => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    event = events.recv() => event,
                }
            }
            State::Idle | State::Closed => return None,
        };

        match delivered {
            Some(WatchEvent::Snapshot(records)) => Some(WatchEvent::Snapshot(records)),
            Some(WatchEvent::Failed(err)) => {
                self.state = State::Closed;
                Some(WatchEvent::Failed(err))
            }
            None => {
                self.state = State::Closed;
                None
            }
        }
    }

    /// Stop deliveries and release the store subscription.
    pub fn unsubscribe(&mut self) {
        self.cancel.cancel();
        self.state = State::Closed;
    }

    /// A new, independent watch on the same query, starting from the current state.
    pub fn restart(&self) -> Self {
        Self::new(self.store.clone(), self.query.clone())
    }

    fn start(&mut self) {
        let (tx, events) = mpsc::unbounded_channel();
        tokio::spawn(pump::<R>(
            self.store.clone(),
            self.query.clone(),
            tx,
            self.cancel.clone(),
        ));
        self.state = State::Running { events };
    }
}

impl<R> Drop for CollectionWatch<R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn to_records<R: DeserializeOwned>(snapshot: &Snapshot) -> DocsResult<Arc<[R]>> {
    let records = snapshot
        .iter()
        .map(|doc| doc.to_record::<R>())
        .collect::<DocsResult<Vec<R>>>()?;
    Ok(records.into())
}

/// Owns the store subscription for one watch until cancelled or failed.
async fn pump<R>(
    store: Arc<dyn DocumentStore>,
    query: Query,
    tx: mpsc::UnboundedSender<WatchEvent<R>>,
    cancel: CancellationToken,
) where
    R: DeserializeOwned + Send + Sync + 'static,
{
    if cancel.is_cancelled() {
        return;
    }

    // Runs to the end even if cancelled; the store may already hold the listener.
    let opened = store.subscribe(query.clone()).await;

    let mut subscription = match opened {
        Ok(subscription) => subscription,
        Err(err) => {
            warn!(collection = %query.collection, "Could not open watch: {}", err);
            let _ = tx.send(WatchEvent::Failed(err));
            return;
        }
    };

    if cancel.is_cancelled() {
        store.unsubscribe(subscription.id).await;
        debug!(collection = %query.collection, subscription = %subscription.id, "Watch cancelled while opening");
        return;
    }

    debug!(collection = %query.collection, subscription = %subscription.id, "Watch running");

    loop {
        let update = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            update = subscription.updates.recv() => update,
        };

        let event = match update {
            Some(Ok(snapshot)) => match to_records::<R>(&snapshot) {
                Ok(records) => WatchEvent::Snapshot(records),
                Err(err) => WatchEvent::Failed(err),
            },
            Some(Err(err)) => WatchEvent::Failed(err),
            None => WatchEvent::Failed(DocsError::subscription(
                query.collection.clone(),
                "closed by store",
            )),
        };

        let terminal = matches!(event, WatchEvent::Failed(_));
        if let WatchEvent::Failed(err) = &event {
            warn!(collection = %query.collection, "Watch failed: {}", err);
        }
        if tx.send(event).is_err() || terminal {
            break;
        }
    }

    store.unsubscribe(subscription.id).await;
    info!(collection = %query.collection, subscription = %subscription.id, "Watch stopped");
}
