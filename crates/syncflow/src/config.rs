//! Configuration structs
//!
//! Constructed once at process start and passed by reference into each
//! component, so tests can substitute fakes and no module-level client
//! state exists anywhere in the crate.

/// Default batch capacity for bulk writes.
pub const DEFAULT_BATCH_THRESHOLD: usize = 101;

/// Default number of notifications pulled per worker cycle.
pub const DEFAULT_PULL_LIMIT: usize = 2;

/// Index naming for the full-reindex path of one record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Stable logical name readers query (e.g. `"entity"`).
    pub alias: String,
    /// Base physical index name that version suffixes attach to
    /// (e.g. `"entities"`).
    pub base: String,
    /// Document type tag written with every document.
    pub doc_type: String,
}

impl IndexConfig {
    /// Create a config for one aliased, versioned index family.
    pub fn new<A, B, T>(alias: A, base: B, doc_type: T) -> Self
    where
        A: Into<String>,
        B: Into<String>,
        T: Into<String>,
    {
        Self {
            alias: alias.into(),
            base: base.into(),
            doc_type: doc_type.into(),
        }
    }
}

/// Kind wiring for the delta-sync path: which store kinds participate and
/// which live index receives the writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaConfig {
    /// Live index (or alias) the delta writes target.
    pub index: String,
    /// Document type tag.
    pub doc_type: String,
    /// Leaf record kind in the store (e.g. `"Contact"`).
    pub record_kind: String,
    /// Parent container kind driving window mode (e.g. `"MediaList"`).
    pub parent_kind: String,
    /// Container field holding member record ids (e.g. `"Contacts"`).
    pub members_field: String,
}

impl DeltaConfig {
    /// The contact/media-list wiring the service was built around.
    #[must_use]
    pub fn contacts() -> Self {
        Self {
            index: "contacts".to_string(),
            doc_type: "contact".to_string(),
            record_kind: "Contact".to_string(),
            parent_kind: "MediaList".to_string(),
            members_field: "Contacts".to_string(),
        }
    }
}

/// Bulk write batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Flush triggers when the buffered count reaches this threshold; a
    /// final flush absorbs any remainder.
    pub threshold: usize,
}

impl BatchConfig {
    /// Batch config with a custom threshold.
    #[must_use]
    pub fn with_threshold(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BATCH_THRESHOLD,
        }
    }
}

/// Change-notification worker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Maximum notifications pulled per cycle.
    pub pull_limit: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pull_limit: DEFAULT_PULL_LIMIT,
        }
    }
}
