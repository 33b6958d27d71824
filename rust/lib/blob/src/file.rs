use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::data_url::DataUrl;
use crate::error::BlobError;
use crate::traits::{BlobStore, UploadReceipt, validate_key};

/// FileStore is a BlobStore backed by the local filesystem.
///
/// Key `posts/42/image` is stored at `{base_dir}/posts/42/image` and
/// served as `{public_base_url}/posts/42/image`. Parent directories are
/// created on upload.
pub struct FileStore {
    base_dir: PathBuf,
    public_base_url: String,
}

impl FileStore {
    /// Open a store rooted at `base_dir`, creating the directory.
    pub async fn open(base_dir: &Path, public_base_url: &str) -> Result<Self, BlobError> {
        fs::create_dir_all(base_dir).await?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(self.base_dir.join(key))
    }
}

#[async_trait]
impl BlobStore for FileStore {
    async fn upload_data_url(&self, key: &str, data: &DataUrl) -> Result<UploadReceipt, BlobError> {
        let path = self.resolve(key)?;
        let bytes = data.decode()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &bytes).await?;
        tracing::debug!(key, size = bytes.len(), "blob stored");

        Ok(UploadReceipt {
            key: key.to_string(),
            size: bytes.len() as u64,
            content_type: data.mime().to_string(),
        })
    }

    async fn public_url(&self, key: &str) -> Result<String, BlobError> {
        let path = self.resolve(key)?;
        if !fs::try_exists(&path).await? {
            return Err(BlobError::NotFound(key.to_string()));
        }
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
