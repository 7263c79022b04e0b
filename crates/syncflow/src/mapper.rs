//! Record to index-document mapping
//!
//! Pure, deterministic, no I/O. The mapper strips internal bookkeeping
//! fields and injects the stable identifiers the resolution logic depends
//! on (`Id`, and `ListId` for child records).

use serde_json::Value;

use crate::record::{IndexDocument, Record};

/// Bookkeeping fields stripped by default, the flattened custom-field pair
/// the store keeps alongside contact records.
pub const DEFAULT_REDACTED_FIELDS: [&str; 2] = ["CustomFields.Name", "CustomFields.Value"];

/// Converts a domain record (plus optional parent context) into an index
/// document.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    doc_type: String,
    redacted: Vec<String>,
}

impl DocumentMapper {
    /// Mapper with the default redaction set.
    pub fn new<T: Into<String>>(doc_type: T) -> Self {
        Self {
            doc_type: doc_type.into(),
            redacted: DEFAULT_REDACTED_FIELDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Replace the redaction set, for kinds with different internal fields
    /// (e.g. user records strip `Password`).
    #[must_use]
    pub fn with_redacted_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redacted = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Document type tag stamped on produced documents.
    #[must_use]
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Map `record` to a document targeting `index`.
    ///
    /// Redacted fields are dropped when present (absence is not an error),
    /// `Id` is injected as the record's integer identifier overwriting any
    /// existing `Id` field, and `ListId` is injected when a parent record is
    /// supplied. Same record and parent always yield a value-equal document.
    #[must_use]
    pub fn to_document(
        &self,
        index: &str,
        record: &Record,
        parent: Option<&Record>,
    ) -> IndexDocument {
        let mut data = record.fields.clone();
        for field in &self.redacted {
            data.remove(field);
        }
        data.insert("Id".to_string(), Value::from(record.id));
        if let Some(parent) = parent {
            data.insert("ListId".to_string(), Value::from(parent.id));
        }

        IndexDocument {
            doc_type: self.doc_type.clone(),
            index: index.to_string(),
            data,
        }
    }
}
