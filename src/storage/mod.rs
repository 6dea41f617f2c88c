//! State persistence module.
//!
//! Blob stores with whole-record replace semantics and the binary records
//! saved through them.

mod blob;
mod records;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use records::*;
