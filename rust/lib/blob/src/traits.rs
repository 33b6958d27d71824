use async_trait::async_trait;

use crate::data_url::DataUrl;
use crate::error::BlobError;

/// Returned once an upload has been durably stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub size: u64,
    pub content_type: String,
}

/// BlobStore holds uploaded files (post images, avatars) under
/// path-like keys such as `posts/{id}/image`.
///
/// Implementations decide how a key maps to a public URL. Swap in an
/// object-storage backend by implementing this trait.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Decode and store a data URL. Overwrites an existing key.
    async fn upload_data_url(&self, key: &str, data: &DataUrl) -> Result<UploadReceipt, BlobError>;

    /// Resolve the public retrieval URL of a stored blob.
    ///
    /// Fails with `NotFound` if nothing is stored under `key`.
    async fn public_url(&self, key: &str) -> Result<String, BlobError>;

    /// Delete a blob. No-op if the key does not exist.
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Reject empty, absolute, or parent-escaping keys.
pub(crate) fn validate_key(key: &str) -> Result<(), BlobError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.starts_with('\\')
        || key.split(['/', '\\']).any(|seg| seg == ".." || seg.is_empty());
    if bad {
        return Err(BlobError::InvalidKey(key.to_string()));
    }
    Ok(())
}
