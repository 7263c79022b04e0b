//! # syncflow
//!
//! Keeps a search index synchronized with a system-of-record datastore.
//!
//! Two problems define the core:
//!
//! - **Full reindexing without downtime** - [`FullReindexer`] rebuilds an
//!   entire index from scratch into a fresh versioned physical index
//!   (`entities_v3`, `entities_v4`, ...) and atomically switches readers
//!   over via an alias cutover before retiring the previous version.
//! - **Incremental synchronization** - [`DeltaSyncer`] detects records
//!   changed within a recent time window, or named by a queue notification,
//!   and applies minimal add/update/delete operations to the live index,
//!   resolving duplicates when a record already exists under a different
//!   backend-internal document id.
//!
//! The three external collaborators sit behind traits so tests substitute
//! in-memory fakes: [`RecordStore`] (the system-of-record),
//! [`SearchBackend`] (the search engine; see `syncflow-opensearch` for the
//! production implementation), and [`TaskQueue`] (at-least-once change
//! notifications).
//!
//! ## Example
//!
//! ```rust,ignore
//! use syncflow::{
//!     BatchConfig, DeltaConfig, DeltaSyncer, DocumentMapper, FullReindexer, IndexConfig,
//! };
//!
//! # async fn example(backend: &impl syncflow::SearchBackend, store: &impl syncflow::RecordStore)
//! # -> syncflow::Result<()> {
//! // Nightly rebuild with alias cutover.
//! let reindexer = FullReindexer::new(
//!     backend,
//!     store,
//!     DocumentMapper::new("entity"),
//!     IndexConfig::new("entity", "entities", "entity"),
//!     BatchConfig::default(),
//! );
//! reindexer.rebuild("Entity").await?;
//!
//! // Recurring catch-up for the last hour.
//! let syncer = DeltaSyncer::new(
//!     backend,
//!     store,
//!     DocumentMapper::new("contact"),
//!     DeltaConfig::contacts(),
//!     BatchConfig::default(),
//! );
//! syncer.sync_changed_since(chrono::Utc::now() - chrono::Duration::hours(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod batch;
pub mod config;
pub mod delta;
pub mod error;
pub mod mapper;
pub mod queue;
pub mod record;
pub mod reindex;
pub mod store;
pub mod version;
pub mod worker;

pub use backend::{
    BulkFailure, BulkOp, BulkReport, IndexCreated, IndexDeleted, SearchBackend, SearchHit,
    ALL_INDICES,
};
pub use batch::BatchWriter;
pub use config::{
    BatchConfig, DeltaConfig, IndexConfig, WorkerConfig, DEFAULT_BATCH_THRESHOLD,
    DEFAULT_PULL_LIMIT,
};
pub use delta::DeltaSyncer;
pub use error::{Error, Result};
pub use mapper::{DocumentMapper, DEFAULT_REDACTED_FIELDS};
pub use queue::{QueueMessage, TaskQueue};
pub use record::{ChangeNotification, IndexDocument, Record};
pub use reindex::FullReindexer;
pub use store::{RecordStore, RecordStream};
pub use worker::ChangeNotificationWorker;
