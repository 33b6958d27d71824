use async_trait::async_trait;

use crate::error::DocError;
use crate::value::{Document, Fields};

/// DocumentStore keeps schemaless documents grouped in collections.
///
/// Writes resolve `FieldValue::ServerTimestamp` with the store's clock.
/// Ids are assigned by the store on create.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document and return its new id.
    async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, DocError>;

    /// Merge `fields` into an existing document.
    ///
    /// Fails with `NotFound` if the document does not exist.
    async fn update_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), DocError>;

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, DocError>;

    /// All documents in a collection, ordered by id.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, DocError>;

    /// Delete a document. No-op if it does not exist.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), DocError>;
}

/// 32 lowercase hex characters.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

pub(crate) fn validate_collection(collection: &str) -> Result<(), DocError> {
    if collection.is_empty() || collection.contains('/') {
        return Err(DocError::InvalidCollection(collection.to_string()));
    }
    Ok(())
}

pub(crate) fn doc_key(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_hex_and_unique() {
        let a = new_document_id();
        let b = new_document_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn collection_names_are_single_level() {
        assert!(validate_collection("posts").is_ok());
        assert!(validate_collection("").is_err());
        assert!(validate_collection("posts/x").is_err());
    }
}
