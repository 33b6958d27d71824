use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::DocError;
use crate::traits::{DocumentStore, doc_key, new_document_id, validate_collection};
use crate::value::{Document, Fields, resolve_server_timestamps};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// RedbDocStore keeps documents as JSON in a redb table, keyed by
/// `{collection}/{id}`.
pub struct RedbDocStore {
    db: Arc<Database>,
}

fn storage<E: Display>(e: E) -> DocError {
    DocError::Storage(e.to_string())
}

fn encode(doc: &Document) -> Result<Vec<u8>, DocError> {
    serde_json::to_vec(doc).map_err(|e| DocError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Document, DocError> {
    serde_json::from_slice(bytes).map_err(|e| DocError::Serialization(e.to_string()))
}

impl RedbDocStore {
    /// Open or create a database at `path`.
    pub fn open(path: &Path) -> Result<Self, DocError> {
        let db = Database::create(path).map_err(storage)?;

        // Create the table up front so reads never see it missing.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Run a transaction on the blocking pool. Commits fsync.
    async fn blocking<T, F>(&self, f: F) -> Result<T, DocError>
    where
        F: FnOnce(&Database) -> Result<T, DocError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| DocError::Storage(format!("redb task failed: {e}")))?
    }
}

fn put(db: &Database, key: &str, doc: &Document) -> Result<(), DocError> {
    let bytes = encode(doc)?;
    let write_txn = db.begin_write().map_err(storage)?;
    {
        let mut table = write_txn.open_table(TABLE).map_err(storage)?;
        table.insert(key, bytes.as_slice()).map_err(storage)?;
    }
    write_txn.commit().map_err(storage)
}

fn read(db: &Database, key: &str) -> Result<Option<Document>, DocError> {
    let read_txn = db.begin_read().map_err(storage)?;
    let table = read_txn.open_table(TABLE).map_err(storage)?;
    match table.get(key).map_err(storage)? {
        Some(val) => decode(val.value()).map(Some),
        None => Ok(None),
    }
}

/// Merge `fields` into the stored document, reading and writing in one
/// transaction so concurrent merges don't race.
fn merge(db: &Database, key: &str, fields: Fields) -> Result<(), DocError> {
    let write_txn = db.begin_write().map_err(storage)?;
    {
        let mut table = write_txn.open_table(TABLE).map_err(storage)?;
        let existing = table
            .get(key)
            .map_err(storage)?
            .map(|v| v.value().to_vec())
            .ok_or_else(|| DocError::NotFound(key.to_string()))?;
        let mut doc = decode(&existing)?;
        doc.fields.extend(fields);
        let bytes = encode(&doc)?;
        table.insert(key, bytes.as_slice()).map_err(storage)?;
    }
    write_txn.commit().map_err(storage)
}

fn scan(db: &Database, prefix: &str) -> Result<Vec<Document>, DocError> {
    let read_txn = db.begin_read().map_err(storage)?;
    let table = read_txn.open_table(TABLE).map_err(storage)?;

    let mut docs = Vec::new();
    for entry in table.range(prefix..).map_err(storage)? {
        let (key, val) = entry.map_err(storage)?;
        if !key.value().starts_with(prefix) {
            break;
        }
        docs.push(decode(val.value())?);
    }
    Ok(docs)
}

fn remove(db: &Database, key: &str) -> Result<(), DocError> {
    let write_txn = db.begin_write().map_err(storage)?;
    {
        let mut table = write_txn.open_table(TABLE).map_err(storage)?;
        table.remove(key).map_err(storage)?;
    }
    write_txn.commit().map_err(storage)
}

#[async_trait]
impl DocumentStore for RedbDocStore {
    async fn create_document(&self, collection: &str, mut fields: Fields) -> Result<String, DocError> {
        validate_collection(collection)?;
        resolve_server_timestamps(&mut fields, Utc::now());
        let id = new_document_id();
        let key = doc_key(collection, &id);
        let doc = Document {
            id: id.clone(),
            collection: collection.to_string(),
            fields,
        };
        self.blocking(move |db| put(db, &key, &doc)).await?;
        tracing::debug!(collection, id = %id, "document created");
        Ok(id)
    }

    async fn update_document(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), DocError> {
        validate_collection(collection)?;
        resolve_server_timestamps(&mut fields, Utc::now());
        let key = doc_key(collection, id);
        self.blocking(move |db| merge(db, &key, fields)).await?;
        tracing::debug!(collection, id, "document updated");
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, DocError> {
        validate_collection(collection)?;
        let key = doc_key(collection, id);
        self.blocking(move |db| read(db, &key)).await
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, DocError> {
        validate_collection(collection)?;
        let prefix = doc_key(collection, "");
        self.blocking(move |db| scan(db, &prefix)).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), DocError> {
        validate_collection(collection)?;
        let key = doc_key(collection, id);
        self.blocking(move |db| remove(db, &key)).await
    }
}
