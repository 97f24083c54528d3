//! # Errors
//!
//! Every failure the workflow or a watch can hit is surfaced as a
//! [`GramError`]: a kind with a status code, a message fit for display,
//! and the underlying cause when there is one.
//! - validation failures never touch the network
//! - transport failures keep the backend's message verbatim
//! - a `GramError` can ride inside `anyhow::Error` and be recovered losslessly

use std::fmt;

use anyhow::Error as AnyError;
use gram_blob::BlobError;
use gram_docs::DocsError;

/// A convenience result type for firegram core APIs.
pub type GramResult<T> = std::result::Result<T, GramError>;

/// Error classes with HTTP-style status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,           // 400
    NotFound,             // 404
    UnsupportedMediaType, // 415
    GeneralError,         // 500
    BadGateway,           // 502
    Unavailable,          // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::UnsupportedMediaType => 415,
            ErrorKind::GeneralError => 500,
            ErrorKind::BadGateway => 502,
            ErrorKind::Unavailable => 503,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::UnsupportedMediaType => "UnsupportedMediaType",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::BadGateway => "BadGateway",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotFound => "not-found",
            ErrorKind::UnsupportedMediaType => "unsupported-media-type",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::BadGateway => "bad-gateway",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

/// A structured firegram error.
#[derive(Debug)]
pub struct GramError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<AnyError>,
}

impl GramError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `GramError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&GramError> {
        err.downcast_ref::<GramError>()
    }

    /// Turn any error into a GramError:
    /// - if it's already a GramError, keep it
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> GramError {
        match err.downcast::<GramError>() {
            Ok(gram) => gram,
            Err(other) => GramError::new(ErrorKind::GeneralError, other.to_string()).with_source(other),
        }
    }

    /// Same kind and message, without the cause. Cheap to hand to a view.
    pub fn detached(&self) -> GramError {
        GramError::new(self.kind, self.message.clone())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn unsupported_media_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedMediaType, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for GramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for GramError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<BlobError> for GramError {
    fn from(err: BlobError) -> Self {
        let (kind, message) = match &err {
            BlobError::Transport { message } => (ErrorKind::BadGateway, message.clone()),
            BlobError::NotFound { .. } => (ErrorKind::NotFound, err.to_string()),
            BlobError::Invalid { .. } => (ErrorKind::BadRequest, err.to_string()),
            BlobError::Backend { .. } | BlobError::Url { .. } => {
                (ErrorKind::GeneralError, err.to_string())
            }
        };
        GramError::new(kind, message).with_source(AnyError::new(err))
    }
}

impl From<DocsError> for GramError {
    fn from(err: DocsError) -> Self {
        let kind = match &err {
            DocsError::Invalid { .. } => ErrorKind::BadRequest,
            DocsError::Write { .. } => ErrorKind::BadGateway,
            DocsError::Subscription { .. } => ErrorKind::Unavailable,
            DocsError::Mapping { .. } => ErrorKind::GeneralError,
        };
        GramError::new(kind, err.to_string()).with_source(AnyError::new(err))
    }
}

/// Return early with a GramError built by one of its constructors.
#[macro_export]
macro_rules! bail_gram {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::GramError::$ctor($msg))
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::GramError::$ctor(format!($fmt, $($arg)*)))
    };
}
