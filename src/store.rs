/// Document store adapter.
///
/// Uniform read access to the four logical collections the admin console
/// works with. Records are opaque JSON documents keyed by id; the analytics
/// engine never writes through this interface.
///
/// Two implementations ship with the crate:
/// - [`memory::MemoryStore`]: process-local, loadable from a JSON dump
/// - [`sqlite::SqliteStore`]: JSON bodies persisted in a SQLite table
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Logical collections of the poetry platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Poems,
    Users,
    Comments,
    PoemRequests,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Poems,
        Collection::Users,
        Collection::Comments,
        Collection::PoemRequests,
    ];

    /// Name of the collection in the backing store and in dump files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poems => "poems",
            Self::Users => "users",
            Self::Comments => "comments",
            Self::PoemRequests => "poemRequests",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored record: opaque id plus its raw fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a document from a JSON object, taking its `id` field as the key.
    ///
    /// Records without a usable id get `fallback_id`. Non-object values yield
    /// a document with no fields.
    pub fn from_value(value: Value, fallback_id: String) -> Self {
        let mut fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let id = match fields.remove("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => fallback_id,
        };
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String field, or None when absent, not a string, or blank.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Identifier field as text. Numeric ids are rendered the way `id` is.
    pub fn identity_text(&self, field: &str) -> Option<String> {
        match self.fields.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Read contract the analytics engine consumes.
///
/// Both primitives take a fresh snapshot per call; nothing is cached.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full scan of a collection.
    async fn list_all(&self, collection: Collection) -> Result<Vec<Document>>;

    /// Number of documents in a collection.
    async fn count(&self, collection: Collection) -> Result<usize>;
}

/// Read and parse a JSON dump file.
pub fn read_dump(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dump file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from: {}", path.display()))
}

/// Split a JSON dump (`{"poems": [...], "users": [...], ...}`) into documents.
///
/// Unknown top-level keys are ignored with a warning; a collection missing
/// from the dump is simply empty.
pub fn parse_dump(dump: &Value) -> Result<Vec<(Collection, Vec<Document>)>> {
    let root = dump
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("Dump root must be a JSON object"))?;

    let mut out = Vec::new();
    for (key, value) in root {
        let Some(collection) = Collection::from_name(key) else {
            tracing::warn!(key = %key, "Ignoring unknown collection in dump");
            continue;
        };
        let records = value
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Collection '{}' must be an array", key))?;
        let docs = records
            .iter()
            .enumerate()
            .map(|(i, v)| Document::from_value(v.clone(), format!("{}-{}", collection, i)))
            .collect();
        out.push((collection, docs));
    }
    Ok(out)
}
