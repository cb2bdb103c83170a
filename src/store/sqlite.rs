/// SQLite-backed document store
///
/// Keeps every collection in one `documents` table with the record body
/// stored as JSON text, so legacy-shaped fields survive untouched.
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use super::{parse_dump, Collection, Document, DocumentStore};

/// Database handle for document operations
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize or open the document database at `db_path`
    pub fn init(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        Self::with_connection(conn)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                seq INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            )",
            [],
        )
        .context("Failed to create documents table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Document database lock poisoned"))
    }

    /// Insert or replace a document. Replacing keeps its original position.
    pub fn upsert(&self, collection: Collection, doc: &Document) -> Result<()> {
        let body = serde_json::to_string(&doc.fields).context("Failed to serialize document")?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, id, body, seq)
             VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(seq), 0) + 1 FROM documents))
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
            params![collection.as_str(), doc.id, body],
        )
        .with_context(|| format!("Failed to upsert {}/{}", collection, doc.id))?;
        Ok(())
    }

    /// Delete a document; returns whether a row was removed
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
        )?;
        Ok(removed > 0)
    }

    /// Import a JSON dump, returning the number of documents written
    pub fn import_dump(&self, dump: &serde_json::Value) -> Result<usize> {
        let mut written = 0;
        for (collection, docs) in parse_dump(dump)? {
            for doc in &docs {
                self.upsert(collection, doc)?;
                written += 1;
            }
            tracing::info!(collection = %collection, documents = docs.len(), "Imported collection");
        }
        Ok(written)
    }

    fn read_collection(&self, collection: Collection) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, body FROM documents
             WHERE collection = ?1
             ORDER BY seq",
        )?;

        let rows = stmt
            .query_map(params![collection.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut docs = Vec::with_capacity(rows.len());
        for (id, body) in rows {
            match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&body) {
                Ok(fields) => docs.push(Document::new(id, fields)),
                Err(e) => {
                    tracing::warn!(collection = %collection, id = %id, error = %e, "Skipping unreadable document body");
                }
            }
        }
        Ok(docs)
    }

    fn count_collection(&self, collection: Collection) -> Result<usize> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM documents WHERE collection = ?1")?;
        let count: usize = stmt.query_row(params![collection.as_str()], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list_all(&self, collection: Collection) -> Result<Vec<Document>> {
        self.read_collection(collection)
            .with_context(|| format!("Failed to list collection '{}'", collection))
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        self.count_collection(collection)
            .with_context(|| format!("Failed to count collection '{}'", collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(value, "fallback".to_string())
    }

    #[tokio::test]
    async fn test_upsert_and_list_in_insertion_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(Collection::Poems, &doc(json!({"id": "b", "title": "B"}))).unwrap();
        store.upsert(Collection::Poems, &doc(json!({"id": "a", "title": "A"}))).unwrap();
        store.upsert(Collection::Poems, &doc(json!({"id": "b", "title": "B2"}))).unwrap();

        let poems = store.list_all(Collection::Poems).await.unwrap();
        let ids: Vec<_> = poems.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(poems[0].text("title"), Some("B2"));
        assert_eq!(store.count(Collection::Poems).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(Collection::Users, &doc(json!({"id": "x"}))).unwrap();
        store.upsert(Collection::Comments, &doc(json!({"id": "x"}))).unwrap();

        assert_eq!(store.count(Collection::Users).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Comments).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Poems).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(Collection::PoemRequests, &doc(json!({"id": "r1"}))).unwrap();

        assert!(store.delete(Collection::PoemRequests, "r1").unwrap());
        assert!(!store.delete(Collection::PoemRequests, "r1").unwrap());
        assert_eq!(store.count(Collection::PoemRequests).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_dump_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("store.sqlite");

        {
            let store = SqliteStore::init(&db_path).unwrap();
            let written = store
                .import_dump(&json!({
                    "poems": [{"id": "p1", "datePosted": {"seconds": 1700000000, "nanoseconds": 0}}],
                    "comments": [{"id": "c1"}, {"id": "c2"}]
                }))
                .unwrap();
            assert_eq!(written, 3);
        }

        let reopened = SqliteStore::init(&db_path).unwrap();
        assert_eq!(reopened.count(Collection::Comments).await.unwrap(), 2);
        let poems = reopened.list_all(Collection::Poems).await.unwrap();
        assert_eq!(poems[0].id, "p1");
        assert_eq!(poems[0].get("datePosted"), Some(&json!({"seconds": 1700000000, "nanoseconds": 0})));
    }
}
