use std::collections::HashMap;
use std::sync::Arc;

use gram_docs::{
    Direction, DocsError, DocumentStore, DocumentWrite, MemoryDocumentStore, Query,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn newest_first() -> Query {
    Query::collection("images").order_by("createdAt", Direction::Descending)
}

#[tokio::test]
async fn subscribe_delivers_current_state_first() {
    let store = MemoryDocumentStore::new();
    store
        .insert("images", DocumentWrite::new().set("url", "u1").server_timestamp("createdAt"))
        .await
        .unwrap();

    let mut sub = store.subscribe(newest_first()).await.unwrap();
    let first = sub.updates.recv().await.unwrap().unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].get("url"), Some(&json!("u1")));
}

#[tokio::test]
async fn every_insert_pushes_a_full_snapshot() {
    let store = MemoryDocumentStore::new();
    let mut sub = store.subscribe(newest_first()).await.unwrap();
    assert!(sub.updates.recv().await.unwrap().unwrap().is_empty());

    for url in ["a", "b", "c"] {
        store
            .insert("images", DocumentWrite::new().set("url", url).server_timestamp("createdAt"))
            .await
            .unwrap();
    }

    let sizes: Vec<usize> = [
        sub.updates.recv().await.unwrap().unwrap(),
        sub.updates.recv().await.unwrap().unwrap(),
        sub.updates.recv().await.unwrap().unwrap(),
    ]
    .iter()
    .map(|s| s.len())
    .collect();
    assert_eq!(sizes, vec![1, 2, 3]);
}

#[tokio::test]
async fn server_timestamps_are_strictly_increasing() {
    let store = MemoryDocumentStore::new();
    for i in 0..50 {
        store
            .insert("images", DocumentWrite::new().set("n", i).server_timestamp("createdAt"))
            .await
            .unwrap();
    }

    let stamps: Vec<String> = store
        .documents("images")
        .iter()
        .map(|d| d.get("createdAt").unwrap().as_str().unwrap().to_string())
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn ordered_snapshot_skips_documents_without_the_field() {
    let store = MemoryDocumentStore::new();
    store.insert("images", DocumentWrite::new().set("url", "no-stamp")).await.unwrap();
    store
        .insert("images", DocumentWrite::new().set("url", "stamped").server_timestamp("createdAt"))
        .await
        .unwrap();

    let ordered = store.snapshot(&newest_first());
    assert_eq!(ordered.len(), 1);
    assert_eq!(ordered[0].get("url"), Some(&json!("stamped")));

    let unordered = store.snapshot(&Query::collection("images"));
    assert_eq!(unordered.len(), 2);
}

#[tokio::test]
async fn ascending_and_descending_orders() {
    let store = MemoryDocumentStore::new();
    for n in [3, 1, 2] {
        store.insert("nums", DocumentWrite::new().set("n", n)).await.unwrap();
    }

    let read = |dir| -> Vec<i64> {
        store
            .snapshot(&Query::collection("nums").order_by("n", dir))
            .iter()
            .map(|d| d.get("n").unwrap().as_i64().unwrap())
            .collect()
    };
    assert_eq!(read(Direction::Ascending), vec![1, 2, 3]);
    assert_eq!(read(Direction::Descending), vec![3, 2, 1]);
}

#[tokio::test]
async fn collections_are_isolated() {
    let store = MemoryDocumentStore::new();
    let mut images = store.subscribe(Query::collection("images")).await.unwrap();
    images.updates.recv().await.unwrap().unwrap();

    store.insert("avatars", DocumentWrite::new().set("url", "x")).await.unwrap();

    assert!(images.updates.try_recv().is_err());
    assert_eq!(store.count("avatars"), 1);
    assert_eq!(store.count("images"), 0);
}

#[tokio::test]
async fn unsubscribe_stops_deliveries() {
    let store = MemoryDocumentStore::new();
    let mut sub = store.subscribe(Query::collection("images")).await.unwrap();
    sub.updates.recv().await.unwrap().unwrap();

    assert!(store.unsubscribe(sub.id).await);
    assert!(!store.unsubscribe(sub.id).await);

    store.insert("images", DocumentWrite::new().set("url", "late")).await.unwrap();
    assert!(sub.updates.recv().await.is_none());
}

#[tokio::test]
async fn failed_write_leaves_no_document() {
    let store = MemoryDocumentStore::new();
    store.fail_next_insert("images", "quota exceeded");

    let err = store
        .insert("images", DocumentWrite::new().set("url", "u"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocsError::Write { ref message, .. } if message == "quota exceeded"));
    assert_eq!(store.count("images"), 0);

    store.insert("images", DocumentWrite::new().set("url", "u")).await.unwrap();
    assert_eq!(store.count("images"), 1);
}

#[tokio::test]
async fn subscription_failure_is_terminal() {
    let store = MemoryDocumentStore::new();
    let mut sub = store.subscribe(Query::collection("images")).await.unwrap();
    sub.updates.recv().await.unwrap().unwrap();

    assert_eq!(store.fail_subscriptions("images", "backend reset"), 1);

    let err = sub.updates.recv().await.unwrap().unwrap_err();
    assert!(err.is_terminal());
    assert!(sub.updates.recv().await.is_none());
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let store = MemoryDocumentStore::new();
    assert!(matches!(
        store.insert("", DocumentWrite::new()).await,
        Err(DocsError::Invalid { .. })
    ));
    assert!(matches!(
        store.subscribe(Query::collection("")).await,
        Err(DocsError::Invalid { .. })
    ));
}

#[tokio::test]
async fn unserializable_field_fails_the_insert() {
    let store = MemoryDocumentStore::new();
    let mut meta = HashMap::new();
    meta.insert((0, 0), "origin");

    let err = assert_err!(
        store
            .insert("images", DocumentWrite::new().set("url", "u").set("meta", meta))
            .await
    );
    assert!(matches!(err, DocsError::Invalid { ref message } if message.contains("meta")));
    assert_eq!(store.count("images"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_deliver_snapshots_in_write_order() {
    for _ in 0..20 {
        let store = Arc::new(MemoryDocumentStore::new());
        let mut sub = assert_ok!(store.subscribe(newest_first()).await);
        assert_ok!(sub.updates.recv().await.expect("initial snapshot"));

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert("images", DocumentWrite::new().set("n", i).server_timestamp("createdAt"))
                        .await
                })
            })
            .collect();
        for writer in writers {
            assert_ok!(assert_ok!(writer.await));
        }

        let mut sizes = Vec::new();
        while let Ok(update) = sub.updates.try_recv() {
            sizes.push(assert_ok!(update).len());
        }
        assert_eq!(sizes, (1..=16).collect::<Vec<_>>());
    }
}
