//! Zero-downtime full reindexing
//!
//! [`FullReindexer::rebuild`] builds a brand-new versioned index from the
//! full corpus of a record kind, then performs an atomic alias cutover and
//! retires the previous version. Readers query the alias throughout and
//! never observe an unpopulated index: the alias moves only after the new
//! index is fully populated, and the old index is deleted only after the
//! alias has moved.

use futures::TryStreamExt;
use tracing::{info, warn};

use crate::backend::{IndexCreated, IndexDeleted, SearchBackend, ALL_INDICES};
use crate::batch::BatchWriter;
use crate::config::{BatchConfig, IndexConfig};
use crate::error::Result;
use crate::mapper::DocumentMapper;
use crate::store::RecordStore;
use crate::version::{next_version, resolve_current};

/// Rebuilds an entire index from the system-of-record and cuts readers over
/// atomically.
///
/// Concurrent rebuilds of the same kind race on version numbering and alias
/// assignment; run at most one per kind (an external advisory lock is the
/// scheduler's responsibility).
pub struct FullReindexer<'a, B: SearchBackend + ?Sized, S: RecordStore + ?Sized> {
    backend: &'a B,
    store: &'a S,
    mapper: DocumentMapper,
    index: IndexConfig,
    batch: BatchConfig,
}

impl<'a, B: SearchBackend + ?Sized, S: RecordStore + ?Sized> FullReindexer<'a, B, S> {
    /// Wire a reindexer against its collaborators.
    pub fn new(
        backend: &'a B,
        store: &'a S,
        mapper: DocumentMapper,
        index: IndexConfig,
        batch: BatchConfig,
    ) -> Self {
        Self {
            backend,
            store,
            mapper,
            index,
            batch,
        }
    }

    /// Rebuild the index for `kind` and cut the alias over to it.
    ///
    /// Steps: resolve the current version from the catalog, create the next
    /// version, stream and bulk-load the full corpus into it, reassign the
    /// alias, delete the previous version. Any failure before the alias
    /// reassignment aborts with the old index still live.
    ///
    /// # Errors
    ///
    /// [`crate::Error::AmbiguousIndex`] when more than one catalog entry
    /// matches the configured base name; backend and store failures
    /// propagate undecorated. "Index already exists" on creation and "not
    /// found" on the final deletion are absorbed as success so a retried
    /// rebuild cannot fail on the leftovers of a prior attempt.
    pub async fn rebuild(&self, kind: &str) -> Result<()> {
        let catalog = self.backend.list_indices().await?;
        let previous = resolve_current(&catalog, &self.index.base)?;
        let new_index = match &previous {
            Some(current) => next_version(current),
            None => next_version(&self.index.base),
        };
        info!(
            kind,
            previous = previous.as_deref(),
            new_index = new_index.as_str(),
            "starting full reindex"
        );

        if self.backend.create_index(&new_index).await? == IndexCreated::AlreadyExists {
            warn!(index = new_index.as_str(), "new index already existed, reusing it");
        }

        let count = self.populate(kind, &new_index).await?;
        info!(index = new_index.as_str(), documents = count, "index populated");

        // Cutover. The window between these two calls is the only moment
        // readers can observe an unbound alias.
        self.backend.delete_alias(ALL_INDICES, &self.index.alias).await?;
        self.backend.put_alias(&new_index, &self.index.alias).await?;
        info!(
            alias = self.index.alias.as_str(),
            index = new_index.as_str(),
            "alias reassigned"
        );

        if let Some(previous) = previous {
            if previous != new_index
                && self.backend.delete_index(&previous).await? == IndexDeleted::NotFound
            {
                warn!(index = previous.as_str(), "previous index was already gone");
            }
        }

        Ok(())
    }

    /// Delete and recreate the bare base index, then repopulate it.
    ///
    /// Break-glass path with no version arithmetic and no alias movement;
    /// readers of the base index see it empty while it refills. Prefer
    /// [`rebuild`](Self::rebuild) for anything serving traffic.
    pub async fn reset(&self, kind: &str) -> Result<()> {
        self.backend.delete_index(&self.index.base).await?;
        self.backend.create_index(&self.index.base).await?;
        let count = self.populate(kind, &self.index.base).await?;
        info!(index = self.index.base.as_str(), documents = count, "index reset");
        Ok(())
    }

    /// Stream the full corpus of `kind` into `target` through the batch
    /// writer, flushing the remainder at stream end.
    async fn populate(&self, kind: &str, target: &str) -> Result<usize> {
        let mut writer = BatchWriter::new(self.backend, self.batch.threshold);
        let mut records = self.store.query(kind).await?;
        let mut count = 0usize;

        while let Some(record) = records.try_next().await? {
            writer.add(self.mapper.to_document(target, &record, None)).await?;
            count += 1;
        }
        writer.flush().await?;
        Ok(count)
    }
}
