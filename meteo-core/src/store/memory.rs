use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::{Document, DocumentPath, DocumentStore, FieldValue};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Merge,
    Set,
}

/// One write as seen by the store, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub kind: WriteKind,
    pub path: DocumentPath,
}

/// In-process document store with the same merge/overwrite semantics as
/// Firestore. Server timestamps resolve to the local clock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<DocumentPath, Document>>,
    writes: Mutex<Vec<WriteRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &DocumentPath) -> Option<Document> {
        lock(&self.documents).get(path).cloned()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.writes).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.documents).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.documents).is_empty()
    }

    /// All documents keyed by their full path.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = lock(&self.documents)
            .iter()
            .map(|(path, doc)| (path.to_string(), doc.to_json()))
            .collect();
        Value::Object(map)
    }

    fn record(&self, kind: WriteKind, path: &DocumentPath) {
        lock(&self.writes).push(WriteRecord {
            kind,
            path: path.clone(),
        });
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn merge(&self, path: &DocumentPath, document: Document) -> Result<(), StoreError> {
        {
            let mut documents = lock(&self.documents);
            let existing = documents.entry(path.clone()).or_default();
            for (name, value) in document.iter() {
                existing.insert(name.clone(), resolve(value));
            }
        }
        self.record(WriteKind::Merge, path);
        Ok(())
    }

    async fn set(&self, path: &DocumentPath, document: Document) -> Result<(), StoreError> {
        let mut replacement = Document::new();
        for (name, value) in document.iter() {
            replacement.insert(name.clone(), resolve(value));
        }
        lock(&self.documents).insert(path.clone(), replacement);
        self.record(WriteKind::Set, path);
        Ok(())
    }
}

fn resolve(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::ServerTimestamp => FieldValue::Timestamp(Utc::now()),
        other => other.clone(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
