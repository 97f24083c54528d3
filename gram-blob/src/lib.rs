//! # gram-blob: named blob uploads with progress
//!
//! `gram-blob` is the storage half of firegram. A [`StorageBackend`] accepts a
//! named blob, reports transfer progress through a callback while bytes move,
//! and resolves a public download URL once the blob is stored.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use gram_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let bucket = MemoryBucket::new("demo.appspot.com", BlobConfig::default().with_chunk_size(4));
//!
//! let progress: ProgressFn = Arc::new(|snap: TransferSnapshot| {
//!     println!("{:.0}%", snap.percent());
//! });
//!
//! let put = BlobPut::new(&b"pixels"[..]).with_content_type("image/png");
//! bucket.put("photo.png", put, progress).await?;
//!
//! let url = bucket.download_url("photo.png").await?;
//! assert!(url.contains("/o/photo.png"));
//! # Ok(())
//! # }
//! ```
//!
//! Same-name puts overwrite; there is no collision detection.

mod config;
mod error;
mod memory_store;
pub mod store;
mod types;

pub use config::{BlobConfig, DEFAULT_DOWNLOAD_BASE_URL};
pub use error::{BlobError, BlobResult};
pub use memory_store::MemoryBucket;
pub use store::{ObjectHead, PutResult, StorageBackend};
pub use types::{no_progress, BlobPut, ProgressFn, TransferSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobConfig, BlobError, BlobPut, BlobResult, MemoryBucket, ProgressFn, StorageBackend,
        TransferSnapshot,
    };
}
