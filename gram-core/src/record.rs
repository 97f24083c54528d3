use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stored field holding the public download URL
pub const URL_FIELD: &str = "url";

/// Stored field holding the server-assigned creation time
pub const CREATED_AT_FIELD: &str = "createdAt";

/// One uploaded image, as read back from the images collection.
///
/// Fields written by other clients are kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
