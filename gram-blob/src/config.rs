/// Default public endpoint for download URLs.
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0/b/";

/// Configuration for blob operations
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Absolute max size allowed for a single blob (safety guard)
    pub max_blob_bytes: u64,

    /// Bytes moved between two progress reports
    pub chunk_size: u64,

    /// Endpoint that download URLs are built from.
    /// Shape: `{base}{bucket}/o/{name}?alt=media&token={token}`
    pub download_base_url: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_blob_bytes: 32 * 1024 * 1024, // 32MB
            chunk_size: 256 * 1024,           // 256KB
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max blob size
    pub fn with_max_blob_bytes(mut self, bytes: u64) -> Self {
        self.max_blob_bytes = bytes;
        self
    }

    /// Set transfer chunk size. Zero is bumped to one byte.
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Set the download endpoint
    pub fn with_download_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.download_base_url = url.into();
        self
    }
}
