/// In-process document store.
///
/// Holds each collection as an ordered list of documents. Collaborators
/// (and tests) mutate it through `insert`/`remove`; the analytics engine only
/// reads through [`DocumentStore`].
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use super::{parse_dump, read_dump, Collection, Document, DocumentStore};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON dump value.
    pub fn from_dump(dump: &serde_json::Value) -> Result<Self> {
        let mut collections = HashMap::new();
        for (collection, docs) in parse_dump(dump)? {
            collections.insert(collection, docs);
        }
        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    /// Load a JSON dump file into a new store.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let dump = read_dump(path)?;
        let store = Self::from_dump(&dump)
            .with_context(|| format!("Invalid dump layout in: {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded document dump into memory");
        Ok(store)
    }

    /// Insert or replace a document by id.
    pub async fn insert(&self, collection: Collection, doc: Document) {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
    }

    /// Remove a document; returns whether it existed.
    pub async fn remove(&self, collection: Collection, id: &str) -> bool {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(&collection) else {
            return false;
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        docs.len() != before
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_all(&self, collection: Collection) -> Result<Vec<Document>> {
        let guard = self.collections.read().await;
        Ok(guard.get(&collection).cloned().unwrap_or_default())
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let guard = self.collections.read().await;
        Ok(guard.get(&collection).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_from_dump_and_count() {
        let store = MemoryStore::from_dump(&json!({
            "poems": [{"id": "p1"}, {"id": "p2"}],
            "users": [{"id": "u1"}]
        }))
        .unwrap();

        assert_eq!(store.count(Collection::Poems).await.unwrap(), 2);
        assert_eq!(store.count(Collection::Users).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Comments).await.unwrap(), 0);
        assert!(store.list_all(Collection::PoemRequests).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_replaces_by_id() {
        let store = MemoryStore::new();
        let first = Document::from_value(json!({"id": "p1", "title": "A"}), String::new());
        let second = Document::from_value(json!({"id": "p1", "title": "B"}), String::new());

        store.insert(Collection::Poems, first).await;
        store.insert(Collection::Poems, second).await;

        let poems = store.list_all(Collection::Poems).await.unwrap();
        assert_eq!(poems.len(), 1);
        assert_eq!(poems[0].text("title"), Some("B"));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryStore::new();
        store
            .insert(
                Collection::Comments,
                Document::from_value(json!({"id": "c1"}), String::new()),
            )
            .await;

        assert!(store.remove(Collection::Comments, "c1").await);
        assert!(!store.remove(Collection::Comments, "c1").await);
        assert!(!store.remove(Collection::Users, "u1").await);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");
        std::fs::write(&path, r#"{"comments": [{"id": "c1", "poemSlug": "p1"}]}"#).unwrap();

        let store = MemoryStore::load_from_file(&path).unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let comments = rt.block_on(store.list_all(Collection::Comments)).unwrap();
        assert_eq!(comments[0].text("poemSlug"), Some("p1"));
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MemoryStore::load_from_file(&dir.path().join("nope.json")).is_err());
    }
}
