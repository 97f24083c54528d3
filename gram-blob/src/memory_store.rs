use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    BlobConfig, BlobError, BlobPut, BlobResult, ObjectHead, ProgressFn, PutResult,
    StorageBackend, TransferSnapshot,
};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: Option<String>,
    updated_at: DateTime<Utc>,
    download_token: String,
}

/// A transport failure armed for the next put of one name.
#[derive(Debug, Clone)]
struct InjectedFault {
    after_bytes: u64,
    message: String,
}

/// In-memory bucket for testing and development.
///
/// Transfers are cut into `chunk_size` ticks with a yield point between
/// them, so progress is observable the same way it is against a remote
/// bucket.
pub struct MemoryBucket {
    bucket: String,
    config: BlobConfig,
    objects: RwLock<HashMap<String, StoredObject>>,
    faults: Mutex<HashMap<String, InjectedFault>>,
}

impl MemoryBucket {
    pub fn new<S: Into<String>>(bucket: S, config: BlobConfig) -> Self {
        Self {
            bucket: bucket.into(),
            config,
            objects: RwLock::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Make the next put of `name` fail once `after_bytes` have been moved.
    pub fn fail_after<N, M>(&self, name: N, after_bytes: u64, message: M)
    where
        N: Into<String>,
        M: Into<String>,
    {
        self.faults.lock().insert(
            name.into(),
            InjectedFault {
                after_bytes,
                message: message.into(),
            },
        );
    }

    /// Stored content of a blob, if any
    pub fn contents(&self, name: &str) -> Option<Bytes> {
        self.objects.read().get(name).map(|o| o.body.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    fn build_url(&self, name: &str, token: &str) -> BlobResult<String> {
        let mut url = Url::parse(&self.config.download_base_url)?;
        url.path_segments_mut()
            .map_err(|_| BlobError::invalid("Download base URL cannot carry a path"))?
            .pop_if_empty()
            .push(&self.bucket)
            .push("o")
            .push(name);
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(url.into())
    }
}

#[async_trait]
impl StorageBackend for MemoryBucket {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, name: &str, put: BlobPut, progress: ProgressFn) -> BlobResult<PutResult> {
        if name.is_empty() {
            return Err(BlobError::invalid("Blob name must not be empty"));
        }

        let total = put.size_bytes();
        if total > self.config.max_blob_bytes {
            return Err(BlobError::invalid(format!(
                "Blob size {} exceeds maximum {}",
                total, self.config.max_blob_bytes
            )));
        }

        // Faults are one-shot: a later put of the same name goes through.
        let fault = self.faults.lock().remove(name);
        let chunk = self.config.chunk_size.max(1);

        debug!(bucket = %self.bucket, name, total, "Starting put");

        let mut sent = 0u64;
        progress(TransferSnapshot::new(sent, total));
        loop {
            if let Some(fault) = &fault {
                if sent >= fault.after_bytes {
                    warn!(bucket = %self.bucket, name, sent, "Transfer failed: {}", fault.message);
                    return Err(BlobError::transport(fault.message.clone()));
                }
            }
            if sent >= total {
                break;
            }
            tokio::task::yield_now().await;
            sent = (sent + chunk).min(total);
            progress(TransferSnapshot::new(sent, total));
        }

        let now = Utc::now();
        let object = StoredObject {
            body: put.body,
            content_type: put.content_type.clone(),
            updated_at: now,
            download_token: Uuid::new_v4().to_string(),
        };
        self.objects.write().insert(name.to_string(), object);

        debug!(bucket = %self.bucket, name, total, "Put complete");

        Ok(PutResult {
            name: name.to_string(),
            size_bytes: total,
            content_type: put.content_type,
            uploaded_at: now,
        })
    }

    async fn head(&self, name: &str) -> BlobResult<ObjectHead> {
        let objects = self.objects.read();
        let object = objects.get(name).ok_or_else(|| BlobError::not_found(name))?;
        Ok(ObjectHead {
            size_bytes: object.body.len() as u64,
            content_type: object.content_type.clone(),
            updated_at: object.updated_at,
            download_token: object.download_token.clone(),
        })
    }

    async fn download_url(&self, name: &str) -> BlobResult<String> {
        let token = self
            .objects
            .read()
            .get(name)
            .map(|o| o.download_token.clone())
            .ok_or_else(|| BlobError::not_found(name))?;
        self.build_url(name, &token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_escapes_name_segments() {
        let bucket = MemoryBucket::new("demo.appspot.com", BlobConfig::default());
        let url = bucket.build_url("summer/beach day.png", "tok").unwrap();
        assert_eq!(
            url,
            "https://firebasestorage.googleapis.com/v0/b/demo.appspot.com/o/summer%2Fbeach%20day.png?alt=media&token=tok"
        );
    }

    #[test]
    fn base_without_trailing_slash() {
        let config = BlobConfig::default().with_download_base_url("http://localhost:9199/v0/b");
        let bucket = MemoryBucket::new("local", config);
        let url = bucket.build_url("a.png", "t").unwrap();
        assert_eq!(url, "http://localhost:9199/v0/b/local/o/a.png?alt=media&token=t");
    }

    #[test]
    fn cannot_be_a_base_url_is_rejected() {
        let config = BlobConfig::default().with_download_base_url("mailto:someone@example.com");
        let bucket = MemoryBucket::new("b", config);
        assert!(matches!(bucket.build_url("a.png", "t"), Err(BlobError::Invalid { .. })));
    }
}
