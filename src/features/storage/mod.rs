pub mod blob;
pub mod handler;

pub use blob::{BlobKind, BlobStore};
pub use handler::create_storage_router;
