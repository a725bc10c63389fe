//! Schema-less document store on top of SQLite.
//!
//! Each collection is its own table holding JSON documents. Every write
//! stamps the document with a `fetched_at` capture timestamp; nothing is
//! ever updated in place.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

pub const TOP_HEADLINES: &str = "top_headlines";
pub const EVERYTHING: &str = "everything";
pub const SOURCES: &str = "sources";
pub const GNEWS_TOP_HEADLINES: &str = "gnews_top_headlines";
pub const SUMMARIZATION_DATA: &str = "summarization_data";

pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open the store named by a connection string.
    ///
    /// Accepts `sqlite://<path>`, a bare path, or `:memory:`.
    pub fn open(url: &str) -> Result<Self> {
        let location = url.strip_prefix("sqlite://").unwrap_or(url).trim();

        if location.is_empty() {
            anyhow::bail!("Store connection string is empty");
        }

        if location == ":memory:" {
            return Self::in_memory();
        }

        let path = Path::new(location);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create store directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open document store: {}", path.display()))?;

        info!(path = %path.display(), "Document store opened");

        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        Ok(Self { conn })
    }

    /// Append a single record to `collection`, returning its capture time
    pub fn insert_one<T: Serialize>(&self, collection: &str, record: &T) -> Result<DateTime<Utc>> {
        self.ensure_collection(collection)?;
        let (document, fetched_at) = stamp(record)?;

        self.conn
            .execute(
                &format!(
                    "INSERT INTO \"{}\" (document, fetched_at) VALUES (?1, ?2)",
                    collection
                ),
                params![document, fetched_at.to_rfc3339()],
            )
            .with_context(|| format!("Failed to insert into {}", collection))?;

        debug!(collection, "Inserted 1 document");
        Ok(fetched_at)
    }

    /// Append every record to `collection` in one transaction.
    ///
    /// An empty slice writes nothing and does not create the collection.
    pub fn insert_many<T: Serialize>(&self, collection: &str, records: &[T]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        self.ensure_collection(collection)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to start transaction")?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (document, fetched_at) VALUES (?1, ?2)",
                collection
            ))?;

            for record in records {
                let (document, fetched_at) = stamp(record)?;
                stmt.execute(params![document, fetched_at.to_rfc3339()])
                    .with_context(|| format!("Failed to insert into {}", collection))?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to commit insert into {}", collection))?;

        debug!(collection, count = records.len(), "Inserted documents");
        Ok(records.len())
    }

    /// Every document in `collection`, oldest first
    pub fn find_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        if !self.has_collection(collection)? {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT document FROM \"{}\" ORDER BY id", collection))?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut documents = Vec::new();
        for row in rows {
            let raw = row?;
            let document = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse document in {}", collection))?;
            documents.push(document);
        }

        Ok(documents)
    }

    pub fn count(&self, collection: &str) -> Result<usize> {
        if !self.has_collection(collection)? {
            return Ok(0);
        }

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", collection),
            [],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    pub fn collection_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list collections")?;

        Ok(names)
    }

    /// Delete every document from every collection, keeping the collections.
    ///
    /// Returns the number of documents removed.
    pub fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;

        for name in self.collection_names()? {
            let deleted = self
                .conn
                .execute(&format!("DELETE FROM \"{}\"", name), [])
                .with_context(|| format!("Failed to clear collection {}", name))?;
            debug!(collection = %name, deleted, "Cleared collection");
            removed += deleted;
        }

        Ok(removed)
    }

    fn has_collection(&self, collection: &str) -> Result<bool> {
        validate_name(collection)?;

        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [collection],
                |_| Ok(()),
            )
            .optional()?;

        Ok(found.is_some())
    }

    fn ensure_collection(&self, collection: &str) -> Result<()> {
        validate_name(collection)?;

        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    id INTEGER PRIMARY KEY,
                    document TEXT NOT NULL,
                    fetched_at TEXT NOT NULL
                );",
                collection
            ))
            .with_context(|| format!("Failed to create collection {}", collection))
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish()
    }
}

// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_name(collection: &str) -> Result<()> {
    let valid = !collection.is_empty()
        && !collection.starts_with("sqlite_")
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        anyhow::bail!("Invalid collection name: {:?}", collection);
    }

    Ok(())
}

fn stamp<T: Serialize>(record: &T) -> Result<(String, DateTime<Utc>)> {
    let mut value = serde_json::to_value(record).context("Failed to serialize record")?;

    let fetched_at = Utc::now();
    match value.as_object_mut() {
        Some(object) => {
            object.insert(
                "fetched_at".to_string(),
                Value::String(fetched_at.to_rfc3339()),
            );
        }
        None => anyhow::bail!("Only JSON objects can be stored, got: {}", value),
    }

    let document = serde_json::to_string(&value).context("Failed to encode document")?;
    Ok((document, fetched_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_one_stamps_fetched_at_at_write_time() {
        let store = DocumentStore::in_memory().unwrap();
        let before = Utc::now();

        store
            .insert_one(
                SOURCES,
                &json!({"id": "bbc", "fetched_at": "2000-01-01T00:00:00Z"}),
            )
            .unwrap();

        let docs: Vec<Value> = store.find_all(SOURCES).unwrap();
        assert_eq!(docs.len(), 1);

        let stamped: DateTime<Utc> = docs[0]["fetched_at"].as_str().unwrap().parse().unwrap();
        assert!(stamped >= before);
        assert_ne!(docs[0]["fetched_at"], "2000-01-01T00:00:00Z");
        assert_eq!(docs[0]["id"], "bbc");
    }

    #[test]
    fn test_insert_many_appends_without_dedup() {
        let store = DocumentStore::in_memory().unwrap();
        let records = vec![json!({"title": "a"}), json!({"title": "a"})];

        assert_eq!(store.insert_many(EVERYTHING, &records).unwrap(), 2);
        assert_eq!(store.insert_many(EVERYTHING, &records).unwrap(), 2);
        assert_eq!(store.count(EVERYTHING).unwrap(), 4);

        let docs: Vec<Value> = store.find_all(EVERYTHING).unwrap();
        assert!(docs.iter().all(|d| d.get("fetched_at").is_some()));
    }

    #[test]
    fn test_insert_many_empty_is_noop() {
        let store = DocumentStore::in_memory().unwrap();
        let records: Vec<Value> = Vec::new();

        assert_eq!(store.insert_many(TOP_HEADLINES, &records).unwrap(), 0);
        assert!(store.collection_names().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_object_records() {
        let store = DocumentStore::in_memory().unwrap();
        assert!(store.insert_one(SOURCES, &json!("just a string")).is_err());
        assert!(store.insert_many(SOURCES, &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_rejects_unsafe_collection_names() {
        let store = DocumentStore::in_memory().unwrap();
        assert!(store.insert_one("a\"; DROP TABLE x; --", &json!({})).is_err());
        assert!(store.insert_one("", &json!({})).is_err());
        assert!(store.insert_one("sqlite_master", &json!({})).is_err());
    }

    #[test]
    fn test_missing_collection_reads_empty() {
        let store = DocumentStore::in_memory().unwrap();
        let docs: Vec<Value> = store.find_all(GNEWS_TOP_HEADLINES).unwrap();
        assert!(docs.is_empty());
        assert_eq!(store.count(GNEWS_TOP_HEADLINES).unwrap(), 0);
    }

    #[test]
    fn test_clear_all_empties_every_collection_and_is_idempotent() {
        let store = DocumentStore::in_memory().unwrap();
        store.insert_one(SOURCES, &json!({"id": "a"})).unwrap();
        store
            .insert_many(SUMMARIZATION_DATA, &[json!({"s": 1}), json!({"s": 2})])
            .unwrap();

        assert_eq!(store.clear_all().unwrap(), 3);
        assert_eq!(store.count(SOURCES).unwrap(), 0);
        assert_eq!(store.count(SUMMARIZATION_DATA).unwrap(), 0);

        // Collections survive the wipe
        assert_eq!(
            store.collection_names().unwrap(),
            vec![SOURCES.to_string(), SUMMARIZATION_DATA.to_string()]
        );

        assert_eq!(store.clear_all().unwrap(), 0);
        assert_eq!(store.collection_names().unwrap().len(), 2);
    }

    #[test]
    fn test_open_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("news.db");
        let url = format!("sqlite://{}", path.display());

        {
            let store = DocumentStore::open(&url).unwrap();
            store.insert_one(TOP_HEADLINES, &json!({"title": "kept"})).unwrap();
        }

        let reopened = DocumentStore::open(path.to_str().unwrap()).unwrap();
        assert_eq!(reopened.count(TOP_HEADLINES).unwrap(), 1);
        assert!(path.exists());
    }

    #[test]
    fn test_open_memory_and_empty_urls() {
        assert!(DocumentStore::open(":memory:").is_ok());
        assert!(DocumentStore::open("sqlite://:memory:").is_ok());
        assert!(DocumentStore::open("").is_err());
    }
}
