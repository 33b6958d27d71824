//! Document store: schemaless documents in named collections.
//!
//! The composer writes posts through [`DocumentStore`]; the backends here
//! are an embedded redb database and an in-memory map.

pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;
pub mod value;

pub use error::DocError;
pub use memory::MemoryDocStore;
pub use self::redb::RedbDocStore;
pub use traits::{DocumentStore, new_document_id};
pub use value::{Document, FieldValue, Fields, fields, resolve_server_timestamps};
