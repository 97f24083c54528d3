use tracing::{debug, info};

use crate::{validate, GramError, ImageFile, PickedFile, UploadEvent, UploadTask, UploadWorkflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uploading,
    Failed,
    Completed,
}

/// Client-side state of one upload, folded from its events.
#[derive(Debug)]
pub struct UploadSession {
    file: ImageFile,
    progress_percent: f64,
    error: Option<GramError>,
    result_url: Option<String>,
}

impl UploadSession {
    pub fn new(file: ImageFile) -> Self {
        Self {
            file,
            progress_percent: 0.0,
            error: None,
            result_url: None,
        }
    }

    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    /// Width of the progress bar, in percent
    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn error(&self) -> Option<&GramError> {
        self.error.as_ref()
    }

    /// The failure message exactly as the backend reported it
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        if self.error.is_some() {
            SessionStatus::Failed
        } else if self.result_url.is_some() {
            SessionStatus::Completed
        } else {
            SessionStatus::Uploading
        }
    }

    /// Fold one event in. Anything after the terminal event is ignored.
    pub fn apply(&mut self, event: &UploadEvent) {
        if self.status() != SessionStatus::Uploading {
            return;
        }
        match event {
            UploadEvent::Progress(pct) => {
                self.progress_percent = pct.clamp(self.progress_percent, 100.0);
            }
            UploadEvent::Failed(err) => self.error = Some(err.detached()),
            UploadEvent::Completed(url) => {
                self.progress_percent = 100.0;
                self.result_url = Some(url.clone());
            }
        }
    }
}

struct ActiveUpload {
    session: UploadSession,
    task: UploadTask,
}

/// The upload form: picks, validates, uploads, and goes back to idle.
///
/// - a valid pick clears the message and starts an upload
/// - an invalid pick (or no pick) clears the file and sets the message
/// - a completed upload resets the form to idle
/// - a failed upload stays visible until the next pick
pub struct UploadForm {
    workflow: UploadWorkflow,
    error: Option<String>,
    active: Option<ActiveUpload>,
    last_url: Option<String>,
}

impl UploadForm {
    pub fn new(workflow: UploadWorkflow) -> Self {
        Self {
            workflow,
            error: None,
            active: None,
            last_url: None,
        }
    }

    /// Handle a picker change. Returns whether an upload was started.
    ///
    /// Any previous upload is detached: it is no longer shown, but it still
    /// finishes and writes its record.
    pub fn select(&mut self, picked: Option<PickedFile>) -> bool {
        let previous = self.active.take();
        if let Some(previous) = &previous {
            debug!(name = previous.task.file_name(), "Detached previous upload");
        }

        match validate(picked) {
            Ok(file) => {
                self.error = None;
                let task = self.workflow.start(file.clone());
                self.active = Some(ActiveUpload {
                    session: UploadSession::new(file),
                    task,
                });
                true
            }
            Err(err) => {
                self.error = Some(err.message);
                false
            }
        }
    }

    /// Wait for the next upload event and fold it into the session.
    ///
    /// Returns `None` when idle, after the session failed, or once the
    /// upload stopped without a terminal event.
    pub async fn advance(&mut self) -> Option<UploadEvent> {
        let active = self.active.as_mut()?;
        if active.session.status() != SessionStatus::Uploading {
            return None;
        }

        let event = active.task.next().await?;
        active.session.apply(&event);

        if let UploadEvent::Completed(url) = &event {
            info!(name = active.task.file_name(), "Upload finished, form idle");
            self.last_url = Some(url.clone());
            self.active = None;
        }
        Some(event)
    }

    /// Drive the current upload until it completes, fails or stops.
    pub async fn settle(&mut self) {
        while self.advance().await.is_some() {}
    }

    /// Stop the current upload and return to idle
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.cancel();
        }
    }

    /// Selected file while an upload is shown
    pub fn file(&self) -> Option<&ImageFile> {
        self.active.as_ref().map(|a| a.session.file())
    }

    /// Validation message for the last pick
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session(&self) -> Option<&UploadSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// URL of the most recent completed upload
    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> UploadSession {
        let file = validate(Some(PickedFile::new("a.png", "image/png", vec![0u8; 4]))).unwrap();
        UploadSession::new(file)
    }

    #[test]
    fn progress_never_goes_backwards() {
        let mut s = session();
        s.apply(&UploadEvent::Progress(50.0));
        s.apply(&UploadEvent::Progress(25.0));
        assert_eq!(s.progress_percent(), 50.0);
        s.apply(&UploadEvent::Progress(140.0));
        assert_eq!(s.progress_percent(), 100.0);
    }

    #[test]
    fn only_the_first_terminal_event_counts() {
        let mut s = session();
        s.apply(&UploadEvent::Failed(GramError::bad_gateway("network lost")));
        s.apply(&UploadEvent::Completed("https://x".into()));
        s.apply(&UploadEvent::Progress(90.0));

        assert_eq!(s.status(), SessionStatus::Failed);
        assert_eq!(s.error_message(), Some("network lost"));
        assert!(s.result_url().is_none());
        assert_eq!(s.progress_percent(), 0.0);
    }

    #[test]
    fn completion_fills_the_bar() {
        let mut s = session();
        s.apply(&UploadEvent::Progress(75.0));
        s.apply(&UploadEvent::Completed("https://cdn/o/a.png".into()));
        assert_eq!(s.status(), SessionStatus::Completed);
        assert_eq!(s.progress_percent(), 100.0);
        assert_eq!(s.result_url(), Some("https://cdn/o/a.png"));
    }
}
