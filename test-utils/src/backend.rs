//! In-memory search backend with a recorded call log

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use syncflow::{
    BulkFailure, BulkOp, BulkReport, Error, IndexCreated, IndexDeleted, Result, SearchBackend,
    SearchHit, ALL_INDICES,
};

/// One recorded backend operation, in call order.
///
/// Bulk entries summarize their operations as `(is_insert, index)` pairs so
/// tests can assert what a batch carried without matching full documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `create_index(name)`
    CreateIndex(String),
    /// `delete_index(name)`
    DeleteIndex(String),
    /// `put_alias(index, alias)`
    PutAlias {
        /// Target index.
        index: String,
        /// Alias name.
        alias: String,
    },
    /// `delete_alias(scope, alias)`
    DeleteAlias {
        /// `"_all"` or an index name.
        scope: String,
        /// Alias name.
        alias: String,
    },
    /// `bulk(ops)`, summarized per op.
    Bulk(Vec<(bool, String)>),
    /// `search_by_field(index, field, ..)`
    Search {
        /// Queried index or alias.
        index: String,
        /// Dotted field path.
        field: String,
    },
    /// `insert(index, ..)`
    Insert(String),
    /// `delete_document(index, .., id)`
    DeleteDocument {
        /// Target index or alias.
        index: String,
        /// Backend-internal document id.
        id: String,
    },
    /// `list_indices()`
    ListIndices,
}

#[derive(Debug, Clone)]
struct StoredDoc {
    id: String,
    doc_type: String,
    body: Value,
}

#[derive(Default)]
struct BackendState {
    indices: BTreeMap<String, Vec<StoredDoc>>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    calls: Vec<BackendCall>,
    next_id: u64,
    reject_next_bulk: Option<String>,
}

impl BackendState {
    fn assign_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }

    /// Resolve an index name or alias to the single physical index behind
    /// it, the way a search engine routes writes and searches.
    fn resolve(&self, name: &str) -> Result<String> {
        if self.indices.contains_key(name) {
            return Ok(name.to_string());
        }
        if let Some(targets) = self.aliases.get(name) {
            let mut iter = targets.iter();
            return match (iter.next(), iter.next()) {
                (Some(index), None) => Ok(index.clone()),
                (Some(_), Some(_)) => Err(Error::backend(format!(
                    "alias {name} points at multiple indices"
                ))),
                (None, _) => Err(Error::backend(format!("alias {name} is unbound"))),
            };
        }
        Err(Error::backend(format!("no such index: {name}")))
    }
}

/// Deterministic, in-process [`SearchBackend`] recording every call.
#[derive(Default)]
pub struct InMemorySearchBackend {
    state: Mutex<BackendState>,
}

#[allow(clippy::unwrap_used)]
impl InMemorySearchBackend {
    /// Empty backend: no indices, no aliases, empty call log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an index without recording a call.
    pub fn create_index_sync(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .indices
            .entry(name.to_string())
            .or_default();
    }

    /// Seed an alias binding without recording a call.
    pub fn put_alias_sync(&self, index: &str, alias: &str) {
        self.state
            .lock()
            .unwrap()
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
    }

    /// Seed a document without recording a call. The body is wrapped under
    /// `data` exactly as the trait implementation stores it.
    pub fn seed_document(&self, index: &str, data: Map<String, Value>) {
        let mut state = self.state.lock().unwrap();
        let id = state.assign_id();
        state
            .indices
            .get_mut(index)
            .unwrap_or_else(|| panic!("seed_document: no such index {index}"))
            .push(StoredDoc {
                id,
                doc_type: String::new(),
                body: json!({ "data": data }),
            });
    }

    /// Every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Sizes of every bulk batch received, in order.
    #[must_use]
    pub fn bulk_batch_sizes(&self) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Bulk(ops) => Some(ops.len()),
                _ => None,
            })
            .collect()
    }

    /// Names of the physical indices currently present.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        self.state.lock().unwrap().indices.keys().cloned().collect()
    }

    /// Indices currently bound under `alias`.
    #[must_use]
    pub fn aliased_indices(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .aliases
            .get(alias)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Stored bodies in `index` (or behind the alias), in insertion order.
    #[must_use]
    pub fn documents(&self, index: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        let Ok(index) = state.resolve(index) else {
            return Vec::new();
        };
        state.indices[&index].iter().map(|d| d.body.clone()).collect()
    }

    /// Stored bodies whose `data.Id` equals `record_id`.
    #[must_use]
    pub fn documents_with_record_id(&self, index: &str, record_id: i64) -> Vec<Value> {
        self.documents(index)
            .into_iter()
            .filter(|body| body.pointer("/data/Id").and_then(Value::as_i64) == Some(record_id))
            .collect()
    }

    /// Make the next bulk call reject every item with `reason`.
    pub fn reject_next_bulk(&self, reason: &str) {
        self.state.lock().unwrap().reject_next_bulk = Some(reason.to_string());
    }
}

fn lookup<'v>(body: &'v Value, dotted: &str) -> Option<&'v Value> {
    let mut current = body;
    for segment in dotted.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[allow(clippy::unwrap_used)]
#[async_trait]
impl SearchBackend for InMemorySearchBackend {
    async fn create_index(&self, name: &str) -> Result<IndexCreated> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::CreateIndex(name.to_string()));
        if state.indices.contains_key(name) {
            return Ok(IndexCreated::AlreadyExists);
        }
        state.indices.insert(name.to_string(), Vec::new());
        Ok(IndexCreated::Created)
    }

    async fn delete_index(&self, name: &str) -> Result<IndexDeleted> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::DeleteIndex(name.to_string()));
        if state.indices.remove(name).is_none() {
            return Ok(IndexDeleted::NotFound);
        }
        for targets in state.aliases.values_mut() {
            targets.remove(name);
        }
        Ok(IndexDeleted::Deleted)
    }

    async fn put_alias(&self, index: &str, alias: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::PutAlias {
            index: index.to_string(),
            alias: alias.to_string(),
        });
        if !state.indices.contains_key(index) {
            return Err(Error::backend(format!(
                "cannot alias missing index: {index}"
            )));
        }
        state
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
        Ok(())
    }

    async fn delete_alias(&self, scope: &str, alias: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::DeleteAlias {
            scope: scope.to_string(),
            alias: alias.to_string(),
        });
        if scope == ALL_INDICES {
            state.aliases.remove(alias);
        } else if let Some(targets) = state.aliases.get_mut(alias) {
            targets.remove(scope);
        }
        Ok(())
    }

    async fn bulk(&self, ops: Vec<BulkOp>) -> Result<BulkReport> {
        let mut state = self.state.lock().unwrap();
        let summary: Vec<(bool, String)> = ops
            .iter()
            .map(|op| match op {
                BulkOp::Insert { index, .. } => (true, index.clone()),
                BulkOp::Delete { index, .. } => (false, index.clone()),
            })
            .collect();
        state.calls.push(BackendCall::Bulk(summary));

        if let Some(reason) = state.reject_next_bulk.take() {
            let failed = ops
                .iter()
                .map(|op| BulkFailure {
                    index: match op {
                        BulkOp::Insert { index, .. } | BulkOp::Delete { index, .. } => {
                            index.clone()
                        }
                    },
                    id: match op {
                        BulkOp::Insert { .. } => None,
                        BulkOp::Delete { id, .. } => Some(id.clone()),
                    },
                    reason: reason.clone(),
                })
                .collect();
            return Ok(BulkReport { accepted: 0, failed });
        }

        let mut report = BulkReport::default();
        for op in ops {
            match op {
                BulkOp::Insert {
                    index,
                    doc_type,
                    data,
                } => match state.resolve(&index) {
                    Ok(index) => {
                        let id = state.assign_id();
                        state.indices.get_mut(&index).unwrap().push(StoredDoc {
                            id,
                            doc_type,
                            body: json!({ "data": data }),
                        });
                        report.accepted += 1;
                    }
                    Err(e) => report.failed.push(BulkFailure {
                        index,
                        id: None,
                        reason: e.to_string(),
                    }),
                },
                BulkOp::Delete { index, id, .. } => match state.resolve(&index) {
                    Ok(index) => {
                        // Deleting an id that is already gone still counts
                        // as accepted, matching engine bulk semantics.
                        state
                            .indices
                            .get_mut(&index)
                            .unwrap()
                            .retain(|doc| doc.id != id);
                        report.accepted += 1;
                    }
                    Err(e) => report.failed.push(BulkFailure {
                        index,
                        id: Some(id),
                        reason: e.to_string(),
                    }),
                },
            }
        }
        Ok(report)
    }

    async fn search_by_field(
        &self,
        index: &str,
        field: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Search {
            index: index.to_string(),
            field: field.to_string(),
        });
        let index = state.resolve(index)?;
        Ok(state.indices[&index]
            .iter()
            .filter(|doc| lookup(&doc.body, field) == Some(value))
            .take(limit)
            .map(|doc| SearchHit {
                id: doc.id.clone(),
                source: doc.body.clone(),
            })
            .collect())
    }

    async fn insert(&self, index: &str, doc_type: &str, data: Map<String, Value>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Insert(index.to_string()));
        let index = state.resolve(index)?;
        let id = state.assign_id();
        state.indices.get_mut(&index).unwrap().push(StoredDoc {
            id,
            doc_type: doc_type.to_string(),
            body: json!({ "data": data }),
        });
        Ok(())
    }

    async fn delete_document(&self, index: &str, _doc_type: &str, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::DeleteDocument {
            index: index.to_string(),
            id: id.to_string(),
        });
        let index = state.resolve(index)?;
        state
            .indices
            .get_mut(&index)
            .unwrap()
            .retain(|doc| doc.id != id);
        Ok(())
    }

    async fn list_indices(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::ListIndices);
        Ok(state.indices.keys().cloned().collect())
    }
}
