//! Error types for syncflow operations
//!
//! Every fallible operation in this crate returns [`Result`]. Use
//! [`Error::is_retryable`] to decide whether a failed pass should be retried
//! by the calling job; the core primitives never retry on their own.

use thiserror::Error;

use crate::backend::BulkFailure;

/// Result type alias for syncflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for syncflow operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Transient transport failure talking to the search backend, the record
    /// store, or the task queue.
    ///
    /// **Recovery:** Retry with backoff at the calling job's discretion.
    /// The next scheduled window sync or queue redelivery covers missed work.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-transient rejection from the search backend (bad request, mapping
    /// conflict, anything that will not heal on retry).
    #[error("Search backend error: {0}")]
    Backend(String),

    /// A record or index that was required does not exist.
    ///
    /// Idempotent create/delete paths absorb the backend's own not-found
    /// responses; this variant is raised where absence is a real failure,
    /// e.g. single-record sync for an id the store no longer holds.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind or index namespace that was queried.
        kind: String,
        /// Identifier that could not be resolved.
        id: String,
    },

    /// More than one physical index matched the expected base name while
    /// resolving the current version during a rebuild.
    ///
    /// **Recovery:** None automatic - the catalog is in a state a rebuild
    /// cannot safely interpret. Requires operator intervention.
    #[error("ambiguous index state for base {base:?}: candidates {candidates:?}")]
    AmbiguousIndex {
        /// Base index name being resolved.
        base: String,
        /// All catalog entries that matched.
        candidates: Vec<String>,
    },

    /// A bulk write completed but the backend rejected some of its items.
    ///
    /// Carries the per-item failure report; the caller decides whether to
    /// retry just those items or abort the pass.
    #[error("bulk write rejected {} document(s)", failed.len())]
    PartialBatchFailure {
        /// The rejected items, in batch order.
        failed: Vec<BulkFailure>,
    },

    /// A queue notification payload could not be parsed.
    #[error("invalid change notification: {0}")]
    InvalidNotification(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a network error from any displayable cause.
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Error::Network(msg.into())
    }

    /// Create a backend error from any displayable cause.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Error::Backend(msg.into())
    }

    /// Create a not-found error for a record kind and id.
    pub fn not_found<K: Into<String>, I: ToString>(kind: K, id: I) -> Self {
        Error::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Whether retrying the failed operation unchanged can succeed.
    ///
    /// Transient transport failures are retryable; validation, ambiguity and
    /// not-found failures are not. Partial batch failures are retryable as a
    /// whole because every write in this crate is idempotent at the pass
    /// level, even though a targeted per-item retry is usually cheaper.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::PartialBatchFailure { .. }
        )
    }
}
