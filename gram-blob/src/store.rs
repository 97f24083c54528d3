use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{BlobPut, BlobResult, ProgressFn};

/// Named blob storage with upload progress - must be implemented by all storage backends
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Bucket this backend writes into
    fn bucket(&self) -> &str;

    /// Store a blob under `name`, replacing any existing blob with that name.
    ///
    /// `progress` is called for every transport tick, starting at zero bytes
    /// and ending at the full size when the put succeeds.
    async fn put(&self, name: &str, put: BlobPut, progress: ProgressFn) -> BlobResult<PutResult>;

    /// Get blob metadata without content
    async fn head(&self, name: &str) -> BlobResult<ObjectHead>;

    /// Resolve the public URL a completed blob can be fetched from
    async fn download_url(&self, name: &str) -> BlobResult<String>;
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub name: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Metadata about a blob
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub download_token: String,
}
