//! Batched bulk writes
//!
//! [`BatchWriter`] accumulates index documents and flushes them as one bulk
//! call per full batch, plus a final remainder flush driven by the owning
//! sync pass. It has no local durability: documents buffered at a crash are
//! regenerated by re-running the (idempotent) owning operation.

use tracing::debug;

use crate::backend::{BulkOp, SearchBackend};
use crate::error::{Error, Result};
use crate::record::IndexDocument;

/// Accumulates documents into fixed-capacity batches and flushes them as
/// bulk writes to the search backend.
///
/// Owned solely by the writer performing one sync pass; the pass must call
/// [`flush`](Self::flush) at stream end to absorb the partial remainder.
pub struct BatchWriter<'a, B: SearchBackend + ?Sized> {
    backend: &'a B,
    threshold: usize,
    buffer: Vec<IndexDocument>,
    flushed: usize,
}

impl<'a, B: SearchBackend + ?Sized> BatchWriter<'a, B> {
    /// Writer flushing every `threshold` documents.
    pub fn new(backend: &'a B, threshold: usize) -> Self {
        Self {
            backend,
            threshold: threshold.max(1),
            buffer: Vec::new(),
            flushed: 0,
        }
    }

    /// Append a document, flushing first when the buffer has reached the
    /// threshold so a batch never exceeds it going into a flush.
    ///
    /// # Errors
    ///
    /// Propagates the implicit flush's failure; the rejected document report
    /// surfaces as [`Error::PartialBatchFailure`].
    pub async fn add(&mut self, doc: IndexDocument) -> Result<()> {
        if self.buffer.len() >= self.threshold {
            self.flush().await?;
        }
        self.buffer.push(doc);
        Ok(())
    }

    /// Send all buffered documents as one bulk call and clear the buffer.
    /// A flush with an empty buffer is a no-op.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let ops: Vec<BulkOp> = self
            .buffer
            .drain(..)
            .map(|doc| BulkOp::Insert {
                index: doc.index,
                doc_type: doc.doc_type,
                data: doc.data,
            })
            .collect();
        let count = ops.len();

        let report = self.backend.bulk(ops).await?;
        if !report.is_success() {
            return Err(Error::PartialBatchFailure {
                failed: report.failed,
            });
        }

        self.flushed += count;
        debug!(batch = count, total = self.flushed, "flushed bulk batch");
        Ok(())
    }

    /// Documents currently buffered and not yet flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Documents successfully flushed so far in this pass.
    #[must_use]
    pub fn flushed(&self) -> usize {
        self.flushed
    }
}
