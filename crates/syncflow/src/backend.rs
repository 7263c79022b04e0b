//! Search backend abstraction
//!
//! The [`SearchBackend`] trait is the narrow waist between the sync
//! components and whatever search engine actually holds the index. It is
//! implementation-agnostic; `syncflow-opensearch` provides the production
//! implementation and `syncflow-test-utils` an in-memory fake with a
//! recorded call log.
//!
//! # Document shape
//!
//! Implementations store each document body as `{"data": <field map>}`, so
//! the stable record identifier is queryable at the path `data.Id`. The
//! backend-internal document id (`_id`) is independent of `data.Id`, which
//! is why duplicate resolution has to search first and delete by internal id.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Outcome of an index creation call.
///
/// "Already exists" is surfaced rather than absorbed so callers can log it;
/// the rebuild path treats both outcomes as success because a retried
/// rebuild must not fail solely because a prior attempt partially succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCreated {
    /// The index was created by this call.
    Created,
    /// The index already existed; treated as success on idempotent paths.
    AlreadyExists,
}

/// Outcome of an index deletion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDeleted {
    /// The index was deleted by this call.
    Deleted,
    /// There was no such index; treated as success on idempotent paths.
    NotFound,
}

/// One operation inside a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    /// Insert a new document (backend assigns the internal id).
    Insert {
        /// Target index name.
        index: String,
        /// Document type tag.
        doc_type: String,
        /// Document field mapping, stored under the `data` key.
        data: Map<String, Value>,
    },
    /// Delete a document by its backend-internal id.
    Delete {
        /// Target index name.
        index: String,
        /// Document type tag.
        doc_type: String,
        /// Backend-internal document id.
        id: String,
    },
}

/// A single rejected item from a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    /// Index the operation targeted.
    pub index: String,
    /// Backend-internal id, when the operation carried one (deletes do,
    /// inserts may not have been assigned one).
    pub id: Option<String>,
    /// Backend-reported reason.
    pub reason: String,
}

/// Per-item outcome report from a bulk write.
///
/// A bulk call that transports successfully can still reject individual
/// items; the report carries both sides so the caller can decide whether to
/// retry just the failures or abort the pass.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// Number of operations the backend accepted.
    pub accepted: usize,
    /// The rejected items, in batch order.
    pub failed: Vec<BulkFailure>,
}

impl BulkReport {
    /// Report with every operation accepted.
    #[must_use]
    pub fn all_accepted(count: usize) -> Self {
        Self {
            accepted: count,
            failed: Vec::new(),
        }
    }

    /// Whether every item in the batch was accepted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total operations attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.accepted + self.failed.len()
    }
}

/// A search match, carrying the backend-internal document id.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Backend-internal document id (`_id`).
    pub id: String,
    /// Stored document body (`{"data": {...}}`).
    pub source: Value,
}

impl SearchHit {
    /// The stable record identifier stored at `data.Id`, if present.
    #[must_use]
    pub fn record_id(&self) -> Option<i64> {
        self.source.pointer("/data/Id").and_then(Value::as_i64)
    }
}

/// Alias scope designating every index currently holding the alias.
pub const ALL_INDICES: &str = "_all";

/// Interface to the search engine.
///
/// All methods are blocking I/O from the sync components' point of view;
/// every call is an await point. Implementations map their engine's
/// "already exists" / "not found" responses onto [`IndexCreated`] /
/// [`IndexDeleted`] rather than errors, because the callers' operations are
/// idempotent by design.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Create a physical index.
    async fn create_index(&self, name: &str) -> Result<IndexCreated>;

    /// Delete a physical index.
    async fn delete_index(&self, name: &str) -> Result<IndexDeleted>;

    /// Bind `alias` to `index`. Readers querying the alias see the bound
    /// index immediately after this call returns.
    async fn put_alias(&self, index: &str, alias: &str) -> Result<()>;

    /// Remove `alias` from `scope` ([`ALL_INDICES`] removes it from every
    /// index currently holding it). An alias that does not exist is not an
    /// error.
    async fn delete_alias(&self, scope: &str, alias: &str) -> Result<()>;

    /// Execute a batch of operations in one call and report per-item
    /// outcomes. An empty batch must not reach the backend; callers skip it.
    async fn bulk(&self, ops: Vec<BulkOp>) -> Result<BulkReport>;

    /// Find documents in `index` whose stored value at `field` (a dotted
    /// path such as `data.Id`) matches `value`, up to `limit` hits.
    async fn search_by_field(
        &self,
        index: &str,
        field: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Insert one document; the backend assigns the internal id.
    async fn insert(&self, index: &str, doc_type: &str, data: Map<String, Value>) -> Result<()>;

    /// Delete one document by backend-internal id. A missing document is
    /// not an error.
    async fn delete_document(&self, index: &str, doc_type: &str, id: &str) -> Result<()>;

    /// List the names of every physical index in the catalog.
    async fn list_indices(&self) -> Result<Vec<String>>;
}
