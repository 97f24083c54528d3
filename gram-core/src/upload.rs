use std::sync::Arc;

use gram_blob::{BlobPut, ProgressFn, StorageBackend, TransferSnapshot};
use gram_docs::{DocumentStore, DocumentWrite};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{GramError, ImageFile, CREATED_AT_FIELD, URL_FIELD};

/// What an upload reports, in order: any number of `Progress`, then at
/// most one of `Failed` / `Completed`.
#[derive(Debug)]
pub enum UploadEvent {
    /// Percent of bytes moved, `0.0..=100.0`, never decreasing
    Progress(f64),
    /// The upload or the record write failed. No record exists.
    Failed(GramError),
    /// The record is written; carries the public download URL.
    Completed(String),
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadEvent::Progress(_))
    }
}

/// Uploads one image and publishes its record.
///
/// Cheap to clone; clones share the project's client handles.
#[derive(Clone)]
pub struct UploadWorkflow {
    storage: Arc<dyn StorageBackend>,
    documents: Arc<dyn DocumentStore>,
    collection: String,
}

impl UploadWorkflow {
    pub fn new<S: Into<String>>(
        storage: Arc<dyn StorageBackend>,
        documents: Arc<dyn DocumentStore>,
        collection: S,
    ) -> Self {
        Self {
            storage,
            documents,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Start uploading `file` on the current tokio runtime.
    ///
    /// The blob is stored under the file's name; an existing blob with the
    /// same name is replaced. Every call uploads again and writes another
    /// record.
    pub fn start(&self, file: ImageFile) -> UploadTask {
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let name = file.name().to_string();

        tokio::spawn(run(
            self.storage.clone(),
            self.documents.clone(),
            self.collection.clone(),
            file,
            tx,
            cancel.clone(),
        ));

        UploadTask {
            name,
            events,
            cancel,
            finished: false,
        }
    }
}

/// Receiving end of one running upload.
///
/// Dropping it detaches the upload: it still runs to completion and still
/// writes its record. Use [`cancel`](Self::cancel) to stop it.
pub struct UploadTask {
    name: String,
    events: mpsc::UnboundedReceiver<UploadEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl UploadTask {
    pub fn file_name(&self) -> &str {
        &self.name
    }

    /// Next event; `None` after the terminal event or once the task stopped.
    pub async fn next(&mut self) -> Option<UploadEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        event
    }

    /// Every remaining event, up to and including the terminal one
    pub async fn collect(mut self) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }

    /// Stop cooperatively. Nothing terminal is published; a record write
    /// already issued is not rolled back.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Turns transport ticks into non-decreasing percentages.
fn progress_reporter(tx: mpsc::UnboundedSender<UploadEvent>) -> ProgressFn {
    let last = Mutex::new(0.0_f64);
    Arc::new(move |snap: TransferSnapshot| {
        let mut last = last.lock();
        let pct = snap.percent().max(*last);
        *last = pct;
        let _ = tx.send(UploadEvent::Progress(pct));
    })
}

async fn run(
    storage: Arc<dyn StorageBackend>,
    documents: Arc<dyn DocumentStore>,
    collection: String,
    file: ImageFile,
    tx: mpsc::UnboundedSender<UploadEvent>,
    cancel: CancellationToken,
) {
    let name = file.name().to_string();
    info!(name = %name, size = file.size_bytes(), "Upload started");

    let put = BlobPut::new(file.bytes().clone()).with_content_type(file.image_type().as_mime());
    let stored = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(name = %name, "Upload cancelled");
            return;
        }
        stored = storage.put(&name, put, progress_reporter(tx.clone())) => stored,
    };
    if let Err(err) = stored {
        warn!(name = %name, "Upload failed: {}", err);
        let _ = tx.send(UploadEvent::Failed(err.into()));
        return;
    }

    let resolved = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(name = %name, "Upload cancelled before publishing");
            return;
        }
        resolved = storage.download_url(&name) => resolved,
    };
    let url = match resolved {
        Ok(url) => url,
        Err(err) => {
            warn!(name = %name, "Could not resolve download URL: {}", err);
            let _ = tx.send(UploadEvent::Failed(err.into()));
            return;
        }
    };
    debug!(name = %name, url = %url, "Download URL resolved");

    if cancel.is_cancelled() {
        info!(name = %name, "Upload cancelled before publishing");
        return;
    }

    // From here on the write is issued and runs to the end.
    let write = DocumentWrite::new()
        .set(URL_FIELD, &url)
        .server_timestamp(CREATED_AT_FIELD);
    match documents.insert(&collection, write).await {
        Ok(id) => {
            info!(name = %name, collection = %collection, id = %id, "Image record written");
            let _ = tx.send(UploadEvent::Completed(url));
        }
        Err(err) => {
            warn!(name = %name, collection = %collection, "Image record write failed: {}", err);
            let _ = tx.send(UploadEvent::Failed(err.into()));
        }
    }
}
