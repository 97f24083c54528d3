use std::sync::Arc;

use gram_docs::{CollectionWatch, WatchEvent};
use tracing::{debug, warn};

use crate::{GramError, ImageRecord};

/// Where a click inside the open modal landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// The dimmed area around the enlarged image
    Backdrop,
    Image,
}

/// Gallery view state: the latest record list plus the enlarged image.
#[derive(Debug)]
pub struct Gallery {
    docs: Arc<[ImageRecord]>,
    selected: Option<String>,
    failure: Option<GramError>,
}

impl Default for Gallery {
    fn default() -> Self {
        Self {
            docs: Vec::<ImageRecord>::new().into(),
            selected: None,
            failure: None,
        }
    }
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the shown list with a delivery, or record the failure.
    ///
    /// The last good list stays on screen after a failure.
    pub fn apply(&mut self, event: WatchEvent<ImageRecord>) {
        match event {
            WatchEvent::Snapshot(docs) => {
                debug!(count = docs.len(), "Gallery updated");
                self.docs = docs;
                self.failure = None;
            }
            WatchEvent::Failed(err) => {
                warn!("Gallery watch failed: {}", err);
                self.failure = Some(err.into());
            }
        }
    }

    /// Records newest first, as last delivered
    pub fn docs(&self) -> &[ImageRecord] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Enlarge the image at `url`
    pub fn open<S: Into<String>>(&mut self, url: S) {
        self.selected = Some(url.into());
    }

    /// Only a backdrop click closes the modal.
    pub fn click(&mut self, target: ClickTarget) {
        if target == ClickTarget::Backdrop {
            self.selected = None;
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn failure(&self) -> Option<&GramError> {
        self.failure.as_ref()
    }

    /// The watch behind this gallery died and a new one is needed
    pub fn needs_resubscribe(&self) -> bool {
        self.failure.is_some()
    }

    /// Apply the next delivery from `watch`. Returns `false` once the
    /// watch has nothing more to deliver.
    pub async fn follow(&mut self, watch: &mut CollectionWatch<ImageRecord>) -> bool {
        match watch.next().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gram_docs::DocsError;

    fn record(id: &str) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            url: format!("https://cdn.test/o/{id}.png"),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            extra: Default::default(),
        }
    }

    #[test]
    fn starts_empty_and_closed() {
        let gallery = Gallery::new();
        assert!(gallery.is_empty());
        assert!(gallery.selected().is_none());
        assert!(!gallery.needs_resubscribe());
    }

    #[test]
    fn only_backdrop_clicks_close_the_modal() {
        let mut gallery = Gallery::new();
        gallery.open("https://cdn.test/o/a.png");

        gallery.click(ClickTarget::Image);
        assert_eq!(gallery.selected(), Some("https://cdn.test/o/a.png"));

        gallery.click(ClickTarget::Backdrop);
        assert!(gallery.selected().is_none());
    }

    #[test]
    fn failure_keeps_the_last_list() {
        let mut gallery = Gallery::new();
        gallery.apply(WatchEvent::Snapshot(vec![record("b"), record("a")].into()));
        gallery.apply(WatchEvent::Failed(DocsError::subscription("images", "reset")));

        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.docs()[0].id, "b");
        assert!(gallery.needs_resubscribe());
        assert_eq!(gallery.failure().map(|e| e.code()), Some(503));
    }
}
