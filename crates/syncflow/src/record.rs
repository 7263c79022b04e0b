//! Domain data model: records, index documents, change notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A domain entity fetched from the system-of-record.
///
/// `id` is assigned by the store and is unique within a `kind`. The field
/// mapping is carried as loosely-typed JSON because the store schema is not
/// this crate's concern - the mapper only ever touches a handful of
/// well-known field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record type name in the store (e.g. `"Contact"`, `"MediaList"`).
    pub kind: String,
    /// Stable positive identifier, unique within `kind`.
    pub id: i64,
    /// Field name to value mapping as stored.
    pub fields: Map<String, Value>,
    /// Last-modified timestamp maintained by the store.
    pub updated: DateTime<Utc>,
}

impl Record {
    /// Create a record with the given kind, id and fields, stamped now.
    #[must_use]
    pub fn new<K: Into<String>>(kind: K, id: i64, fields: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            id,
            fields,
            updated: Utc::now(),
        }
    }

    /// Integer ids listed under `field`, for container records that hold
    /// their membership as an array of record ids.
    ///
    /// A missing field or non-array value yields an empty list; individual
    /// non-integer entries are skipped. Containers with malformed membership
    /// simply have nothing to sync.
    #[must_use]
    pub fn member_ids(&self, field: &str) -> Vec<i64> {
        self.fields
            .get(field)
            .and_then(Value::as_array)
            .map(|members| members.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }
}

/// The unit written to the search backend.
///
/// Produced fresh by the mapper for each sync pass, never mutated after
/// creation, consumed exactly once by a write.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    /// Document type tag (mirrors the record kind or a fixed literal).
    pub doc_type: String,
    /// Target index name.
    pub index: String,
    /// Redacted field mapping with `Id` (and `ListId` for child records)
    /// injected as integers.
    pub data: Map<String, Value>,
}

/// A changed-record notification delivered by the task queue.
///
/// Wire payload is `{"Id": <integer>}`. Delivery is at-least-once; the
/// worker acknowledges only after the record has been applied to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Identifier of the record that changed.
    #[serde(rename = "Id")]
    pub id: i64,
}

impl ChangeNotification {
    /// Parse a raw queue payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNotification`] when the payload is not an
    /// object carrying an integer `Id`.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        serde_json::from_value(payload.clone())
            .map_err(|e| Error::InvalidNotification(format!("{payload}: {e}")))
    }
}
