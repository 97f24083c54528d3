use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Point-in-time view of a running transfer, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSnapshot {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl TransferSnapshot {
    pub fn new(bytes_transferred: u64, total_bytes: u64) -> Self {
        Self {
            bytes_transferred,
            total_bytes,
        }
    }

    /// Percentage of bytes moved, clamped to `[0, 100]`.
    ///
    /// An empty blob has nothing left to move and reports 100.
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        let pct = self.bytes_transferred as f64 / self.total_bytes as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_transferred >= self.total_bytes
    }
}

/// Progress callback. Invoked in order, on the task driving the upload.
pub type ProgressFn = Arc<dyn Fn(TransferSnapshot) + Send + Sync>;

/// Progress callback that ignores every report.
pub fn no_progress() -> ProgressFn {
    Arc::new(|_: TransferSnapshot| {})
}

/// Request to store a named blob
#[derive(Debug, Clone)]
pub struct BlobPut {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl BlobPut {
    pub fn new<B: Into<Bytes>>(body: B) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size_bytes(&self) -> u64 {
        self.body.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_quarters() {
        assert_eq!(TransferSnapshot::new(0, 1000).percent(), 0.0);
        assert_eq!(TransferSnapshot::new(250, 1000).percent(), 25.0);
        assert_eq!(TransferSnapshot::new(1000, 1000).percent(), 100.0);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(TransferSnapshot::new(1200, 1000).percent(), 100.0);
        assert_eq!(TransferSnapshot::new(0, 0).percent(), 100.0);
    }
}
