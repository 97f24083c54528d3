use std::sync::Arc;

use gram_blob::{BlobConfig, MemoryBucket, StorageBackend};
use gram_docs::{CollectionWatch, DocumentStore, MemoryDocumentStore};
use tracing::{info, warn};

use crate::{
    GramConfig, GramConfigSnapshot, GramError, GramResult, ImageRecord, UploadForm,
    UploadWorkflow, CREATED_AT_FIELD,
};

/// Collection image records are written to unless configured otherwise
pub const DEFAULT_COLLECTION: &str = "images";

/// Web config of the hosted project, plus local knobs.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub images_collection: String,
    pub blob: BlobConfig,
}

impl ProjectConfig {
    pub fn new<P: Into<String>, B: Into<String>>(project_id: P, storage_bucket: B) -> Self {
        Self {
            api_key: None,
            auth_domain: None,
            project_id: project_id.into(),
            storage_bucket: storage_bucket.into(),
            messaging_sender_id: None,
            app_id: None,
            images_collection: DEFAULT_COLLECTION.to_string(),
            blob: BlobConfig::default(),
        }
    }

    /// Read from config keys:
    ///
    /// | key | field |
    /// |-----|-------|
    /// | `project.id` (required) | `project_id` |
    /// | `storage.bucket` (required) | `storage_bucket` |
    /// | `project.api_key`, `project.auth_domain`, `project.messaging_sender_id`, `project.app_id` | web config |
    /// | `images.collection` | `images_collection` |
    /// | `storage.download_base_url`, `storage.max_blob_bytes`, `storage.chunk_size` | `blob` |
    pub fn from_snapshot(snap: &GramConfigSnapshot) -> GramResult<Self> {
        let project_id = snap
            .get_string("project.id")
            .ok_or_else(|| GramError::bad_request("Missing config key: project.id"))?;
        let storage_bucket = snap
            .get_string("storage.bucket")
            .ok_or_else(|| GramError::bad_request("Missing config key: storage.bucket"))?;

        let mut blob = BlobConfig::default();
        if let Some(url) = snap.get_string("storage.download_base_url") {
            blob = blob.with_download_base_url(url);
        }
        if let Some(max) = snap.get_u64("storage.max_blob_bytes") {
            blob = blob.with_max_blob_bytes(max);
        }
        if let Some(chunk) = snap.get_u64("storage.chunk_size") {
            blob = blob.with_chunk_size(chunk);
        }

        Ok(Self {
            api_key: snap.get_string("project.api_key"),
            auth_domain: snap.get_string("project.auth_domain"),
            project_id,
            storage_bucket,
            messaging_sender_id: snap.get_string("project.messaging_sender_id"),
            app_id: snap.get_string("project.app_id"),
            images_collection: snap
                .get_string("images.collection")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            blob,
        })
    }

    pub fn with_images_collection<S: Into<String>>(mut self, name: S) -> Self {
        self.images_collection = name.into();
        self
    }

    pub fn with_blob_config(mut self, blob: BlobConfig) -> Self {
        self.blob = blob;
        self
    }
}

/// The one place storage and document clients are created.
///
/// Build it once at startup and hand out references; every workflow and
/// watch borrows the same two handles.
pub struct Project {
    config: ProjectConfig,
    storage: Arc<dyn StorageBackend>,
    documents: Arc<dyn DocumentStore>,
}

impl Project {
    /// Project backed by an in-process bucket and document store
    pub fn in_memory(config: ProjectConfig) -> Self {
        let storage = MemoryBucket::new(config.storage_bucket.clone(), config.blob.clone());
        Self::with_backends(config, Arc::new(storage), Arc::new(MemoryDocumentStore::new()))
    }

    /// In-memory project from a config store
    pub fn from_config(config: &GramConfig) -> GramResult<Self> {
        Ok(Self::in_memory(ProjectConfig::from_snapshot(&config.snapshot())?))
    }

    pub fn with_backends(
        config: ProjectConfig,
        storage: Arc<dyn StorageBackend>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        if storage.bucket() != config.storage_bucket {
            warn!(
                configured = %config.storage_bucket,
                backend = storage.bucket(),
                "Storage backend bucket differs from project config"
            );
        }
        info!(
            project = %config.project_id,
            bucket = %config.storage_bucket,
            collection = %config.images_collection,
            "Project initialized"
        );
        Self {
            config,
            storage,
            documents,
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    pub fn upload_workflow(&self) -> UploadWorkflow {
        UploadWorkflow::new(
            self.storage.clone(),
            self.documents.clone(),
            self.config.images_collection.clone(),
        )
    }

    pub fn upload_form(&self) -> UploadForm {
        UploadForm::new(self.upload_workflow())
    }

    /// A new, independent watch over the images collection, newest first
    pub fn watch_images(&self) -> CollectionWatch<ImageRecord> {
        CollectionWatch::newest_first(
            self.documents.clone(),
            self.config.images_collection.clone(),
            CREATED_AT_FIELD,
        )
    }
}
