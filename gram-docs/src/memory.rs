use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    compare_values, format_timestamp, Direction, DocsError, DocsResult, Document, DocumentId,
    DocumentStore, DocumentWrite, Query, Snapshot, SnapshotHub, Subscription, SubscriptionId,
};

#[derive(Debug, Clone)]
struct StoredDoc {
    seq: u64,
    doc: Document,
}

/// In-memory realtime store for testing and development.
///
/// Every insert rebuilds the ordered snapshot of each live query on that
/// collection and pushes it to the subscriber.
pub struct MemoryDocumentStore {
    /// Documents per collection, in insertion order
    collections: RwLock<HashMap<String, Vec<StoredDoc>>>,

    /// Live queries
    hub: RwLock<SnapshotHub>,

    /// Last server timestamp handed out
    clock: Mutex<Option<DateTime<Utc>>>,

    /// Insertion counter, used to break ordering ties
    seq: AtomicU64,

    /// collection -> message for the next failing insert
    write_faults: Mutex<HashMap<String, String>>,

    /// Held from append through delivery, so subscribers see snapshots in write order
    publish_lock: Mutex<()>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            hub: RwLock::new(SnapshotHub::new()),
            clock: Mutex::new(None),
            seq: AtomicU64::new(0),
            write_faults: Mutex::new(HashMap::new()),
            publish_lock: Mutex::new(()),
        }
    }

    /// Server clock. Strictly increasing at microsecond precision.
    fn stamp(&self) -> DateTime<Utc> {
        let mut last = self.clock.lock();
        let mut now = Utc::now().trunc_subsecs(6);
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }

    /// Ordered view of one query, rebuilt from scratch.
    ///
    /// With an ordering, documents lacking the field are left out.
    pub fn snapshot(&self, query: &Query) -> Snapshot {
        let collections = self.collections.read();
        let Some(docs) = collections.get(&query.collection) else {
            return Vec::<Document>::new().into();
        };

        let mut rows: Vec<&StoredDoc> = match &query.order_by {
            Some(order) => docs
                .iter()
                .filter(|d| d.doc.data.contains_key(&order.field))
                .collect(),
            None => docs.iter().collect(),
        };

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.doc.get(&order.field).unwrap_or(&Value::Null),
                    b.doc.get(&order.field).unwrap_or(&Value::Null),
                )
                .then(a.seq.cmp(&b.seq));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        rows.into_iter().map(|r| r.doc.clone()).collect()
    }

    /// Push a fresh snapshot to every live query on `collection`.
    fn publish(&self, collection: &str) {
        let targets = self.hub.read().targets(collection);

        let mut gone = Vec::new();
        for target in targets {
            let snapshot = self.snapshot(&target.query);
            if target.sender.send(Ok(snapshot)).is_err() {
                gone.push(target.id);
            }
        }

        if !gone.is_empty() {
            let mut hub = self.hub.write();
            for id in gone {
                hub.off(id);
            }
        }
    }

    /// Make the next insert into `collection` fail with `message`.
    pub fn fail_next_insert<C, M>(&self, collection: C, message: M)
    where
        C: Into<String>,
        M: Into<String>,
    {
        self.write_faults.lock().insert(collection.into(), message.into());
    }

    /// End every live query on `collection` with a subscription error.
    /// Returns how many subscribers were cut off.
    pub fn fail_subscriptions(&self, collection: &str, message: &str) -> usize {
        let removed = self.hub.write().remove_all(Some(collection));
        for target in &removed {
            let _ = target
                .sender
                .send(Err(DocsError::subscription(collection, message)));
        }
        warn!(collection, count = removed.len(), "Failed live queries: {}", message);
        removed.len()
    }

    /// Documents of a collection in insertion order
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .map(|docs| docs.iter().map(|d| d.doc.clone()).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Live queries across all collections
    pub fn subscriber_count(&self) -> usize {
        let mut hub = self.hub.write();
        hub.prune_closed();
        hub.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, write: DocumentWrite) -> DocsResult<DocumentId> {
        if collection.trim().is_empty() {
            return Err(DocsError::invalid("Collection name must not be empty"));
        }
        write.check()?;
        if let Some(message) = self.write_faults.lock().remove(collection) {
            warn!(collection, "Insert rejected: {}", message);
            return Err(DocsError::write(collection, message));
        }

        let _publishing = self.publish_lock.lock();
        let mut data = write.fields;
        if !write.server_timestamps.is_empty() {
            let now = format_timestamp(self.stamp());
            for field in write.server_timestamps {
                data.insert(field, Value::String(now.clone()));
            }
        }

        let id = DocumentId::new();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(StoredDoc {
                seq,
                doc: Document {
                    id: id.clone(),
                    data,
                },
            });

        debug!(collection, id = %id, "Inserted document");
        self.publish(collection);
        Ok(id)
    }

    async fn subscribe(&self, query: Query) -> DocsResult<Subscription> {
        query.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let _publishing = self.publish_lock.lock();
            let mut hub = self.hub.write();
            let id = hub.on(query.clone(), tx.clone());
            let _ = tx.send(Ok(self.snapshot(&query)));
            id
        };

        info!(collection = %query.collection, subscription = %id, "Opened live query");
        Ok(Subscription {
            id,
            query,
            updates: rx,
        })
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.hub.write().off(id);
        if removed {
            info!(subscription = %id, "Closed live query");
        }
        removed
    }
}
