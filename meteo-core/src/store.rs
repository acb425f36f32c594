use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value, json};
use std::{collections::BTreeMap, fmt};

use crate::error::StoreError;

pub mod firestore;
pub mod memory;

/// A single field value as the document store understands it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Resolved by the store to the time it handles the write.
    ServerTimestamp,
}

impl FieldValue {
    /// Plain JSON rendering, used for dumps and dry runs.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => json!(b),
            FieldValue::Integer(i) => json!(i),
            FieldValue::Double(d) => json!(d),
            FieldValue::String(s) => json!(s),
            FieldValue::Timestamp(ts) => json!(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FieldValue::ServerTimestamp => json!("<server timestamp>"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// Integers stay integers; anything else is stored as a double.
impl From<Number> for FieldValue {
    fn from(value: Number) -> Self {
        match (value.as_i64(), value.as_f64()) {
            (Some(i), _) => FieldValue::Integer(i),
            (None, Some(d)) => FieldValue::Double(d),
            (None, None) => FieldValue::Null,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Ordered set of named fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        Value::Object(map)
    }
}

/// Address of a document: alternating collection and document ids,
/// e.g. `meteo_caledonie/Nouméa/previsions/jour_1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            segments: vec![collection.into(), id.into()],
        }
    }

    /// Path of a document inside a sub-collection of this one.
    pub fn child(&self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(collection.into());
        segments.push(id.into());
        Self { segments }
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Create the document or update only the fields present in `document`.
    async fn merge(&self, path: &DocumentPath, document: Document) -> Result<(), StoreError>;

    /// Replace the whole document with `document`.
    async fn set(&self, path: &DocumentPath, document: Document) -> Result<(), StoreError>;
}
