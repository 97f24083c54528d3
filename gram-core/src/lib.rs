//! gram-core: the image sharing workflow of firegram.
//!
//! Pick a file, check it is a png or jpeg, upload it under its own name with
//! live progress, then write an image record carrying its download URL and a
//! server-assigned creation time. Any number of galleries watch the records
//! collection and re-render, newest first, after every write.
//!
//! ```rust
//! use gram_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let project = Project::in_memory(ProjectConfig::new("firegram-7d25b", "firegram-7d25b.appspot.com"));
//! let mut gallery = Gallery::new();
//! let mut watch = project.watch_images();
//!
//! let mut form = project.upload_form();
//! form.select(Some(PickedFile::new("photo.png", "image/png", vec![0u8; 64])));
//! form.settle().await;
//! assert!(form.is_idle());
//!
//! gallery.follow(&mut watch).await;
//! assert_eq!(gallery.len(), 1);
//! # }
//! ```

pub mod config;
pub mod errors;
mod gallery;
mod project;
mod record;
mod session;
mod upload;
mod validation;

pub use config::{GramConfig, GramConfigSnapshot, ENV_PREFIX};
pub use errors::{ErrorKind, GramError, GramResult};
pub use gallery::{ClickTarget, Gallery};
pub use project::{Project, ProjectConfig, DEFAULT_COLLECTION};
pub use record::{ImageRecord, CREATED_AT_FIELD, URL_FIELD};
pub use session::{SessionStatus, UploadForm, UploadSession};
pub use upload::{UploadEvent, UploadTask, UploadWorkflow};
pub use validation::{
    validate, ImageFile, ImageType, PickedFile, ALLOWED_TYPES, INVALID_TYPE_MESSAGE,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ClickTarget, Gallery, GramError, GramResult, ImageRecord, PickedFile, Project,
        ProjectConfig, UploadEvent, UploadForm, UploadWorkflow,
    };
    pub use gram_docs::{CollectionWatch, WatchEvent};
}
