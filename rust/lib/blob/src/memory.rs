use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::data_url::DataUrl;
use crate::error::BlobError;
use crate::traits::{BlobStore, UploadReceipt, validate_key};

/// In-process BlobStore. URLs have the form `memory://{key}`.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredBlob> {
        self.blobs.read().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.blobs.read().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_data_url(&self, key: &str, data: &DataUrl) -> Result<UploadReceipt, BlobError> {
        validate_key(key)?;
        let bytes = data.decode()?;
        let size = bytes.len() as u64;
        self.blobs.write().unwrap().insert(
            key.to_string(),
            StoredBlob {
                content_type: data.mime().to_string(),
                data: bytes,
            },
        );
        Ok(UploadReceipt {
            key: key.to_string(),
            size,
            content_type: data.mime().to_string(),
        })
    }

    async fn public_url(&self, key: &str) -> Result<String, BlobError> {
        validate_key(key)?;
        if !self.blobs.read().unwrap().contains_key(key) {
            return Err(BlobError::NotFound(key.to_string()));
        }
        Ok(format!("memory://{}", key))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        validate_key(key)?;
        self.blobs.write().unwrap().remove(key);
        Ok(())
    }
}
