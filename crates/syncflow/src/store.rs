//! System-of-record abstraction
//!
//! The store is queryable by record kind, filterable by the `updated`
//! timestamp, and returns unbounded result sets as async streams so a full
//! corpus scan never materializes wholesale. Cursor-based pagination is an
//! implementation detail hidden behind the stream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::Result;
use crate::record::Record;

/// Lazy sequence of records, yielding per-record fetch errors in-band.
pub type RecordStream<'a> = BoxStream<'a, Result<Record>>;

/// Interface to the system-of-record datastore.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stream every record of `kind`.
    async fn query(&self, kind: &str) -> Result<RecordStream<'_>>;

    /// Stream records of `kind` whose `updated` timestamp is at or after
    /// `cutoff`.
    async fn query_updated_since(
        &self,
        kind: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<RecordStream<'_>>;

    /// Fetch one record by id. Absence is `Ok(None)`, not an error; the
    /// caller decides whether a missing record is a failure.
    async fn get(&self, kind: &str, id: i64) -> Result<Option<Record>>;
}
