use thiserror::Error;

/// Result type for document operations
pub type DocsResult<T> = Result<T, DocsError>;

/// Errors raised by document stores and collection watches
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocsError {
    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Write to '{collection}' failed: {message}")]
    Write { collection: String, message: String },

    /// The live subscription ended on the store side. Terminal for a watch.
    #[error("Subscription to '{collection}' failed: {message}")]
    Subscription { collection: String, message: String },

    #[error("Document {id} could not be mapped: {message}")]
    Mapping { id: String, message: String },
}

impl DocsError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn write<C: Into<String>, S: Into<String>>(collection: C, message: S) -> Self {
        Self::Write {
            collection: collection.into(),
            message: message.into(),
        }
    }

    pub fn subscription<C: Into<String>, S: Into<String>>(collection: C, message: S) -> Self {
        Self::Subscription {
            collection: collection.into(),
            message: message.into(),
        }
    }

    pub fn mapping<I: Into<String>>(id: I, error: serde_json::Error) -> Self {
        Self::Mapping {
            id: id.into(),
            message: error.to_string(),
        }
    }

    /// Whether a watch must be recreated after this error. A failed write
    /// leaves live queries untouched; everything else ends them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Write { .. })
    }
}
