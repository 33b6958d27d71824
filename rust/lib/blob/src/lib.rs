pub mod data_url;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use data_url::{DataUrl, mime_for_path};
pub use error::BlobError;
pub use file::FileStore;
pub use memory::{MemoryBlobStore, StoredBlob};
pub use traits::{BlobStore, UploadReceipt};
