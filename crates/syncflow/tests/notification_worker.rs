//! Worker integration tests: acknowledge-after-success, redelivery of
//! failed notifications, and cooperative shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use serde_json::{json, Map};
use syncflow::{
    BatchConfig, ChangeNotificationWorker, DeltaConfig, DeltaSyncer, DocumentMapper, Record,
    WorkerConfig,
};
use syncflow_test_utils::{InMemoryRecordStore, InMemorySearchBackend, InMemoryTaskQueue};
use tokio::sync::watch;

fn contact(id: i64, name: &str) -> Record {
    let mut fields = Map::new();
    fields.insert("FirstName".to_string(), json!(name));
    Record::new("Contact", id, fields)
}

fn syncer<'a>(
    backend: &'a InMemorySearchBackend,
    store: &'a InMemoryRecordStore,
) -> DeltaSyncer<'a, InMemorySearchBackend, InMemoryRecordStore> {
    DeltaSyncer::new(
        backend,
        store,
        DocumentMapper::new("contact"),
        DeltaConfig::contacts(),
        BatchConfig::default(),
    )
}

/// Run the worker until `done` reports true, then signal shutdown. The
/// worker borrows its collaborators, so it is joined on this task rather
/// than spawned.
async fn run_until<Q, B, S, F>(worker: &ChangeNotificationWorker<'_, Q, B, S>, done: F)
where
    Q: syncflow::TaskQueue + ?Sized,
    B: syncflow::SearchBackend + ?Sized,
    S: syncflow::RecordStore + ?Sized,
    F: Fn() -> bool,
{
    let (tx, rx) = watch::channel(false);
    let driver = async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(true).unwrap();
    };
    tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(worker.run(rx), driver);
    })
    .await
    .expect("worker did not reach the expected state");
}

#[tokio::test]
async fn applies_notifications_and_acknowledges_each() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("contacts");
    let store = InMemoryRecordStore::new();
    store.put(contact(1, "Ada"));
    store.put(contact(2, "Blaise"));
    store.put(contact(3, "Grace"));
    let queue = InMemoryTaskQueue::new();
    for id in [1, 2, 3] {
        queue.push_notification(id);
    }

    let syncer = syncer(&backend, &store);
    let worker = ChangeNotificationWorker::new(&queue, &syncer, WorkerConfig::default());
    run_until(&worker, || queue.acked().len() == 3).await;

    for id in [1, 2, 3] {
        assert_eq!(backend.documents_with_record_id("contacts", id).len(), 1);
    }
    assert_eq!(queue.unacked_in_flight(), 0);
    assert_eq!(queue.pending(), 0);
}

#[tokio::test]
async fn failed_sync_leaves_the_message_for_redelivery() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("contacts");
    let store = InMemoryRecordStore::new();
    let queue = InMemoryTaskQueue::new();
    // No such record yet; the sync fails and the message must stay unacked.
    queue.push_notification(9);

    let syncer = syncer(&backend, &store);
    let worker = ChangeNotificationWorker::new(&queue, &syncer, WorkerConfig::default());
    run_until(&worker, || queue.unacked_in_flight() == 1).await;
    assert!(queue.acked().is_empty());
    assert!(backend.documents_with_record_id("contacts", 9).is_empty());

    // The record appears, the broker redelivers, and the retry succeeds.
    store.put(contact(9, "Ada"));
    queue.redeliver_unacked();
    run_until(&worker, || queue.acked().len() == 1).await;
    assert_eq!(backend.documents_with_record_id("contacts", 9).len(), 1);
    assert_eq!(queue.unacked_in_flight(), 0);
}

#[tokio::test]
async fn redelivered_notification_resolves_idempotently() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("contacts");
    let store = InMemoryRecordStore::new();
    store.put(contact(4, "Ada"));
    let queue = InMemoryTaskQueue::new();
    queue.push_notification(4);

    let syncer = syncer(&backend, &store);
    let worker = ChangeNotificationWorker::new(&queue, &syncer, WorkerConfig::default());
    run_until(&worker, || queue.acked().len() == 1).await;

    // The broker delivers the same change again after the ack raced a
    // visibility timeout. The second pass replaces, never duplicates.
    queue.push_notification(4);
    run_until(&worker, || queue.acked().len() == 2).await;

    assert_eq!(backend.documents_with_record_id("contacts", 4).len(), 1);
}

#[tokio::test]
async fn malformed_payload_is_discarded_without_ack() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("contacts");
    let store = InMemoryRecordStore::new();
    store.put(contact(1, "Ada"));
    let queue = InMemoryTaskQueue::new();
    queue.push_raw(json!({"RecordId": 1}));
    queue.push_notification(1);

    let syncer = syncer(&backend, &store);
    let worker = ChangeNotificationWorker::new(&queue, &syncer, WorkerConfig::default());
    run_until(&worker, || queue.acked().len() == 1).await;

    // The well-formed message was applied; the malformed one is neither
    // acked nor indexed.
    assert_eq!(queue.unacked_in_flight(), 1);
    assert_eq!(backend.documents_with_record_id("contacts", 1).len(), 1);
}

#[tokio::test]
async fn shutdown_interrupts_an_idle_pull() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("contacts");
    let store = InMemoryRecordStore::new();
    let queue = InMemoryTaskQueue::new();

    let syncer = syncer(&backend, &store);
    let worker = ChangeNotificationWorker::new(&queue, &syncer, WorkerConfig::default());

    let (tx, rx) = watch::channel(false);
    tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(worker.run(rx), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(true).unwrap();
        });
    })
    .await
    .expect("worker did not shut down");
}
