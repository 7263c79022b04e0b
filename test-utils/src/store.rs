//! In-memory system-of-record

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use syncflow::{Record, RecordStore, RecordStream, Result};

/// Deterministic, in-process [`RecordStore`].
///
/// Records are keyed by `(kind, id)`; streams yield in ascending id order
/// so tests see a stable ordering.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<BTreeMap<(String, i64), Record>>,
}

#[allow(clippy::unwrap_used)]
impl InMemoryRecordStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn put(&self, record: Record) {
        self.records
            .lock()
            .unwrap()
            .insert((record.kind.clone(), record.id), record);
    }

    /// Remove a record, returning whether it existed.
    pub fn remove(&self, kind: &str, id: i64) -> bool {
        self.records
            .lock()
            .unwrap()
            .remove(&(kind.to_string(), id))
            .is_some()
    }

    /// Number of records of `kind`.
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, _)| k == kind)
            .count()
    }

    fn select<F: Fn(&Record) -> bool>(&self, kind: &str, keep: F) -> Vec<Record> {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.kind == kind && keep(r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn query(&self, kind: &str) -> Result<RecordStream<'_>> {
        let records = self.select(kind, |_| true);
        Ok(stream::iter(records.into_iter().map(Ok)).boxed())
    }

    async fn query_updated_since(
        &self,
        kind: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<RecordStream<'_>> {
        let records = self.select(kind, |r| r.updated >= cutoff);
        Ok(stream::iter(records.into_iter().map(Ok)).boxed())
    }

    async fn get(&self, kind: &str, id: i64) -> Result<Option<Record>> {
        #[allow(clippy::unwrap_used)]
        let records = self.records.lock().unwrap();
        Ok(records.get(&(kind.to_string(), id)).cloned())
    }
}
