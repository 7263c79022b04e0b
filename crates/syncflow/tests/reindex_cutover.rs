//! Full-reindex integration tests against the in-memory backend:
//! versioned index naming, alias cutover ordering, and idempotence.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use serde_json::{json, Map, Value};
use syncflow::{
    BatchConfig, DocumentMapper, Error, FullReindexer, IndexConfig, Record,
};
use syncflow_test_utils::{BackendCall, InMemoryRecordStore, InMemorySearchBackend};

fn entity(id: i64) -> Record {
    let mut fields = Map::new();
    fields.insert("Name".to_string(), json!(format!("entity-{id}")));
    Record::new("Entity", id, fields)
}

fn seed_store(count: i64) -> InMemoryRecordStore {
    let store = InMemoryRecordStore::new();
    for id in 1..=count {
        store.put(entity(id));
    }
    store
}

fn reindexer<'a>(
    backend: &'a InMemorySearchBackend,
    store: &'a InMemoryRecordStore,
    threshold: usize,
) -> FullReindexer<'a, InMemorySearchBackend, InMemoryRecordStore> {
    FullReindexer::new(
        backend,
        store,
        DocumentMapper::new("entity"),
        IndexConfig::new("entity", "entities", "entity"),
        BatchConfig::with_threshold(threshold),
    )
}

fn record_ids(backend: &InMemorySearchBackend, index: &str) -> Vec<i64> {
    let mut ids: Vec<i64> = backend
        .documents(index)
        .iter()
        .filter_map(|body| body.pointer("/data/Id").and_then(Value::as_i64))
        .collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn rebuild_replaces_unversioned_index_with_v1() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("entities");
    backend.put_alias_sync("entities", "entity");
    let store = seed_store(3);

    reindexer(&backend, &store, 101).rebuild("Entity").await.unwrap();

    assert_eq!(backend.index_names(), vec!["entities_v1".to_string()]);
    assert_eq!(backend.aliased_indices("entity"), vec!["entities_v1".to_string()]);
    assert_eq!(record_ids(&backend, "entity"), vec![1, 2, 3]);
}

#[tokio::test]
async fn alias_is_never_unbound_beyond_the_cutover_pair() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("entities");
    backend.put_alias_sync("entities", "entity");
    let store = seed_store(5);

    reindexer(&backend, &store, 101).rebuild("Entity").await.unwrap();

    let calls = backend.calls();
    let delete_alias = calls
        .iter()
        .position(|c| matches!(c, BackendCall::DeleteAlias { .. }))
        .expect("alias deleted");
    let put_alias = calls
        .iter()
        .position(|c| matches!(c, BackendCall::PutAlias { .. }))
        .expect("alias put");

    // The rebind follows the unbind immediately; nothing runs in between.
    assert_eq!(put_alias, delete_alias + 1);

    // Population completes before the cutover, retirement after it.
    let last_bulk = calls
        .iter()
        .rposition(|c| matches!(c, BackendCall::Bulk(_)))
        .expect("populated via bulk");
    assert!(last_bulk < delete_alias);
    let delete_index = calls
        .iter()
        .position(|c| matches!(c, BackendCall::DeleteIndex(_)))
        .expect("previous index retired");
    assert!(delete_index > put_alias);
}

#[tokio::test]
async fn rebuild_twice_is_idempotent_and_monotonic() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("entities");
    let store = seed_store(4);
    let reindexer = reindexer(&backend, &store, 101);

    reindexer.rebuild("Entity").await.unwrap();
    let first_ids = record_ids(&backend, "entity");
    assert_eq!(backend.aliased_indices("entity").len(), 1);

    reindexer.rebuild("Entity").await.unwrap();
    assert_eq!(backend.index_names(), vec!["entities_v2".to_string()]);
    assert_eq!(backend.aliased_indices("entity"), vec!["entities_v2".to_string()]);
    assert_eq!(record_ids(&backend, "entity"), first_ids);
}

#[tokio::test]
async fn first_rebuild_with_empty_catalog() {
    let backend = InMemorySearchBackend::new();
    let store = seed_store(2);

    reindexer(&backend, &store, 101).rebuild("Entity").await.unwrap();

    assert_eq!(backend.index_names(), vec!["entities_v1".to_string()]);
    assert_eq!(backend.aliased_indices("entity"), vec!["entities_v1".to_string()]);
    // Nothing existed to retire.
    assert!(!backend
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::DeleteIndex(_))));
}

#[tokio::test]
async fn ambiguous_catalog_aborts_before_touching_anything() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("entities_v1");
    backend.create_index_sync("entities_v2");
    let store = seed_store(1);

    let err = reindexer(&backend, &store, 101)
        .rebuild("Entity")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AmbiguousIndex { .. }));

    // Only the catalog was read; no index or alias was modified.
    assert_eq!(backend.calls(), vec![BackendCall::ListIndices]);
    let mut names = backend.index_names();
    names.sort();
    assert_eq!(names, vec!["entities_v1".to_string(), "entities_v2".to_string()]);
}

#[tokio::test]
async fn rebuild_streams_full_corpus_in_batches() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("entities");
    let store = seed_store(250);

    reindexer(&backend, &store, 101).rebuild("Entity").await.unwrap();

    assert_eq!(backend.bulk_batch_sizes(), vec![101, 101, 48]);
    assert_eq!(record_ids(&backend, "entity").len(), 250);
}

#[tokio::test]
async fn failed_population_leaves_old_index_live() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("entities");
    backend.put_alias_sync("entities", "entity");
    let store = seed_store(3);
    backend.reject_next_bulk("disk full");

    let err = reindexer(&backend, &store, 101)
        .rebuild("Entity")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PartialBatchFailure { .. }));

    // The alias still points at the old index; the partial new index is
    // left behind unaliased, harmless until the next attempt.
    assert_eq!(backend.aliased_indices("entity"), vec!["entities".to_string()]);
    assert!(!backend
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::PutAlias { .. })));
}

#[tokio::test]
async fn reset_rebuilds_base_index_in_place() {
    let backend = InMemorySearchBackend::new();
    backend.create_index_sync("entities");
    let mut stale = Map::new();
    stale.insert("Id".to_string(), json!(999));
    backend.seed_document("entities", stale);
    let store = seed_store(2);

    reindexer(&backend, &store, 101).reset("Entity").await.unwrap();

    assert_eq!(record_ids(&backend, "entities"), vec![1, 2]);
}
