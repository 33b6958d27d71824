use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::DocError;
use crate::traits::{DocumentStore, doc_key, new_document_id, validate_collection};
use crate::value::{Document, Fields, resolve_server_timestamps};

/// In-process DocumentStore for tests and demos.
#[derive(Default)]
pub struct MemoryDocStore {
    docs: RwLock<BTreeMap<String, Document>>,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocStore {
    async fn create_document(&self, collection: &str, mut fields: Fields) -> Result<String, DocError> {
        validate_collection(collection)?;
        resolve_server_timestamps(&mut fields, Utc::now());
        let id = new_document_id();
        self.docs.write().unwrap().insert(
            doc_key(collection, &id),
            Document {
                id: id.clone(),
                collection: collection.to_string(),
                fields,
            },
        );
        Ok(id)
    }

    async fn update_document(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), DocError> {
        validate_collection(collection)?;
        resolve_server_timestamps(&mut fields, Utc::now());
        let key = doc_key(collection, id);
        let mut docs = self.docs.write().unwrap();
        let doc = docs.get_mut(&key).ok_or(DocError::NotFound(key.clone()))?;
        doc.fields.extend(fields);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, DocError> {
        validate_collection(collection)?;
        Ok(self.docs.read().unwrap().get(&doc_key(collection, id)).cloned())
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, DocError> {
        validate_collection(collection)?;
        let prefix = doc_key(collection, "");
        Ok(self
            .docs
            .read()
            .unwrap()
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, d)| d.clone())
            .collect())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), DocError> {
        validate_collection(collection)?;
        self.docs.write().unwrap().remove(&doc_key(collection, id));
        Ok(())
    }
}
