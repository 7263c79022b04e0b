//! Incremental synchronization
//!
//! [`DeltaSyncer`] applies minimal add/update/delete operations to the live
//! index. All paths share one resolution policy: search the live index for
//! the record's stable `Id`, delete every stale match by its
//! backend-internal document id, and only then insert the fresh document.
//! The backend-internal id is independent of the domain id, so an
//! upsert-by-domain-id is not available; this delete-then-insert sequence is
//! the only thing preventing duplicates, not an optimization.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{BulkOp, SearchBackend, SearchHit};
use crate::batch::BatchWriter;
use crate::config::{BatchConfig, DeltaConfig};
use crate::error::{Error, Result};
use crate::mapper::DocumentMapper;
use crate::store::RecordStore;

/// Search page size when resolving existing documents for one record id.
/// Generously above any plausible duplicate count for a single id.
const RESOLVE_LIMIT: usize = 10_000;

/// Search page size when listing a container's documents.
const LIST_LIMIT: usize = 1_000;

/// Finds records changed since a cutoff (window mode) or named by id
/// (single-record mode) and reconciles the live index to match the store.
pub struct DeltaSyncer<'a, B: SearchBackend + ?Sized, S: RecordStore + ?Sized> {
    backend: &'a B,
    store: &'a S,
    mapper: DocumentMapper,
    config: DeltaConfig,
    batch: BatchConfig,
}

impl<'a, B: SearchBackend + ?Sized, S: RecordStore + ?Sized> DeltaSyncer<'a, B, S> {
    /// Wire a syncer against its collaborators.
    pub fn new(
        backend: &'a B,
        store: &'a S,
        mapper: DocumentMapper,
        config: DeltaConfig,
        batch: BatchConfig,
    ) -> Self {
        Self {
            backend,
            store,
            mapper,
            config,
            batch,
        }
    }

    /// Window mode: reconcile every record whose `updated` timestamp is at
    /// or after `cutoff`.
    ///
    /// Window mode is container-driven: each parent container's membership
    /// is walked, and members found in the changed set are re-synced with
    /// the container as parent context. A member id with no pending change
    /// this cycle is silently skipped; a changed leaf with no owning
    /// container is not synced here by design (single-record mode has no
    /// such restriction).
    ///
    /// Re-running with an overlapping or identical cutoff reprocesses the
    /// same records safely.
    pub async fn sync_changed_since(&self, cutoff: DateTime<Utc>) -> Result<()> {
        let changed = self.changed_records(cutoff).await?;
        if changed.is_empty() {
            debug!(%cutoff, "no records changed in window");
            return Ok(());
        }

        let mut writer = BatchWriter::new(self.backend, self.batch.threshold);
        let mut synced = 0usize;

        let mut containers = self.store.query(&self.config.parent_kind).await?;
        while let Some(container) = containers.try_next().await? {
            for member_id in container.member_ids(&self.config.members_field) {
                let Some(record) = changed.get(&member_id) else {
                    continue;
                };
                // The stale copies must be confirmed gone before this
                // record's insert is queued, so the deleted copy and the new
                // copy are never both queryable.
                self.delete_stale(record.id).await?;
                writer
                    .add(self.mapper.to_document(&self.config.index, record, Some(&container)))
                    .await?;
                synced += 1;
            }
        }
        writer.flush().await?;

        info!(%cutoff, changed = changed.len(), synced, "window sync complete");
        Ok(())
    }

    /// Single-record mode: fetch one record by id and reconcile it, without
    /// parent context.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the store no longer holds the record.
    pub async fn sync_one(&self, record_id: i64) -> Result<()> {
        let record = self
            .store
            .get(&self.config.record_kind, record_id)
            .await?
            .ok_or_else(|| Error::not_found(self.config.record_kind.clone(), record_id))?;

        let deleted = self.delete_stale(record_id).await?;
        let doc = self.mapper.to_document(&self.config.index, &record, None);
        self.backend
            .insert(&doc.index, &doc.doc_type, doc.data)
            .await?;

        debug!(record_id, stale_deleted = deleted, "record synced");
        Ok(())
    }

    /// Reconcile one container list's documents against its current
    /// membership in the store.
    ///
    /// Deletes documents whose record is no longer a member, deletes extra
    /// copies of duplicated records, and inserts members that have no
    /// document yet, all in a single bulk call (skipped when there is
    /// nothing to do). Members whose record has vanished from the store are
    /// skipped.
    pub async fn sync_list(&self, list_id: i64) -> Result<()> {
        let container = self
            .store
            .get(&self.config.parent_kind, list_id)
            .await?
            .ok_or_else(|| Error::not_found(self.config.parent_kind.clone(), list_id))?;
        let members: Vec<i64> = container.member_ids(&self.config.members_field);

        let hits = self
            .backend
            .search_by_field(
                &self.config.index,
                "data.ListId",
                &Value::from(list_id),
                LIST_LIMIT,
            )
            .await?;
        let (indexed, duplicates) = index_by_record_id(&hits);

        let mut ops: Vec<BulkOp> = Vec::new();

        // Documents whose record left the list, and every extra copy of a
        // duplicated record.
        for (record_id, backend_id) in &indexed {
            if !members.contains(record_id) {
                ops.push(self.delete_op(backend_id.clone()));
            }
        }
        for backend_id in duplicates {
            ops.push(self.delete_op(backend_id));
        }

        // Members with no document yet.
        let mut added = 0usize;
        for member_id in &members {
            if indexed.contains_key(member_id) {
                continue;
            }
            let Some(record) = self.store.get(&self.config.record_kind, *member_id).await? else {
                continue;
            };
            let doc = self
                .mapper
                .to_document(&self.config.index, &record, Some(&container));
            ops.push(BulkOp::Insert {
                index: doc.index,
                doc_type: doc.doc_type,
                data: doc.data,
            });
            added += 1;
        }

        if ops.is_empty() {
            debug!(list_id, "list already consistent");
            return Ok(());
        }

        let deleted = ops.len() - added;
        let report = self.backend.bulk(ops).await?;
        if !report.is_success() {
            return Err(Error::PartialBatchFailure {
                failed: report.failed,
            });
        }

        info!(list_id, added, deleted, "list membership reconciled");
        Ok(())
    }

    /// Delete every live document carrying `data.Id == record_id`, by
    /// backend-internal id. Returns how many were deleted.
    async fn delete_stale(&self, record_id: i64) -> Result<usize> {
        let hits = self
            .backend
            .search_by_field(
                &self.config.index,
                "data.Id",
                &Value::from(record_id),
                RESOLVE_LIMIT,
            )
            .await?;

        for hit in &hits {
            self.backend
                .delete_document(&self.config.index, &self.config.doc_type, &hit.id)
                .await?;
        }
        Ok(hits.len())
    }

    /// Collect the changed leaf set into an id-keyed map for O(1) lookup
    /// while walking container memberships.
    async fn changed_records(&self, cutoff: DateTime<Utc>) -> Result<HashMap<i64, crate::Record>> {
        let mut changed = HashMap::new();
        let mut stream = self
            .store
            .query_updated_since(&self.config.record_kind, cutoff)
            .await?;
        while let Some(record) = stream.try_next().await? {
            changed.insert(record.id, record);
        }
        Ok(changed)
    }

    fn delete_op(&self, backend_id: String) -> BulkOp {
        BulkOp::Delete {
            index: self.config.index.clone(),
            doc_type: self.config.doc_type.clone(),
            id: backend_id,
        }
    }
}

/// Map record id to one backend id, collecting the backend ids of every
/// extra copy beyond the first as duplicates to delete.
fn index_by_record_id(hits: &[SearchHit]) -> (HashMap<i64, String>, Vec<String>) {
    let mut indexed: HashMap<i64, String> = HashMap::new();
    let mut duplicates = Vec::new();

    for hit in hits {
        let Some(record_id) = hit.record_id() else {
            continue;
        };
        if indexed.contains_key(&record_id) {
            duplicates.push(hit.id.clone());
        } else {
            indexed.insert(record_id, hit.id.clone());
        }
    }
    (indexed, duplicates)
}
