use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::{DocsResult, Query, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

static SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_subscription_id() -> SubscriptionId {
    SubscriptionId(SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Sending half of a live query
pub type SnapshotSender = mpsc::UnboundedSender<DocsResult<Snapshot>>;

#[derive(Clone)]
struct ListenerEntry {
    id: SubscriptionId,
    query: Query,
    sender: SnapshotSender,
}

/// One delivery target picked out by [`SnapshotHub::targets`]
#[derive(Clone)]
pub struct Target {
    pub id: SubscriptionId,
    pub query: Query,
    pub sender: SnapshotSender,
}

/// Registry of live queries.
///
/// Emission is split in two so callers never hold a lock across `.await`:
/// 1) pick targets for a collection (read-only)
/// 2) send to them and `off` the ones whose receiver is gone (write)
#[derive(Default)]
pub struct SnapshotHub {
    listeners: Vec<ListenerEntry>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn on(&mut self, query: Query, sender: SnapshotSender) -> SubscriptionId {
        let id = next_subscription_id();
        self.listeners.push(ListenerEntry { id, query, sender });
        id
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|e| e.id != id);
        before != self.listeners.len()
    }

    /// Drop every listener, optionally only those on one collection.
    /// Returns the dropped targets so the caller can notify them.
    pub fn remove_all(&mut self, collection: Option<&str>) -> Vec<Target> {
        let mut removed = Vec::new();
        self.listeners.retain(|e| {
            let hit = collection.map_or(true, |c| e.query.collection == c);
            if hit {
                removed.push(Target {
                    id: e.id,
                    query: e.query.clone(),
                    sender: e.sender.clone(),
                });
            }
            !hit
        });
        removed
    }

    /// Listeners on `collection` whose receiver is still alive.
    pub fn targets(&self, collection: &str) -> Vec<Target> {
        self.listeners
            .iter()
            .filter(|e| e.query.collection == collection && !e.sender.is_closed())
            .map(|e| Target {
                id: e.id,
                query: e.query.clone(),
                sender: e.sender.clone(),
            })
            .collect()
    }

    /// Forget listeners whose receiver was dropped without unsubscribing.
    pub fn prune_closed(&mut self) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|e| !e.sender.is_closed());
        before - self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_off_is_exact() {
        let mut hub = SnapshotHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = hub.on(Query::collection("images"), tx.clone());
        let b = hub.on(Query::collection("images"), tx);

        assert_ne!(a, b);
        assert!(hub.off(a));
        assert!(!hub.off(a));
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn targets_skip_other_collections_and_dead_receivers() {
        let mut hub = SnapshotHub::new();
        let (live_tx, _live_rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        let (other_tx, _other_rx) = mpsc::unbounded_channel();

        let live = hub.on(Query::collection("images"), live_tx);
        hub.on(Query::collection("images"), dead_tx);
        hub.on(Query::collection("avatars"), other_tx);
        drop(dead_rx);

        let targets = hub.targets("images");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, live);

        assert_eq!(hub.prune_closed(), 1);
        assert_eq!(hub.len(), 2);
    }

    #[test]
    fn remove_all_scoped_to_collection() {
        let mut hub = SnapshotHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        hub.on(Query::collection("images"), tx.clone());
        hub.on(Query::collection("images"), tx.clone());
        hub.on(Query::collection("avatars"), tx);

        assert_eq!(hub.remove_all(Some("images")).len(), 2);
        assert_eq!(hub.remove_all(None).len(), 1);
        assert!(hub.is_empty());
    }
}
