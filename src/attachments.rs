//! Attachment lifecycle
//!
//! Images removed from a document stay on disk until the save that drops
//! them has committed. If the save aborts, the document can still be
//! reverted to reference them; if the edit is discarded they are never
//! touched.

use crate::storage::{DeleteOutcome, FileStore};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Outcome of deleting pending images after a commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub deleted: Vec<String>,
    /// Already absent from disk
    pub missing: Vec<String>,
    /// Could not be deleted; logged and left behind
    pub failed: Vec<String>,
}

/// Images removed during the current edit session, awaiting deletion
#[derive(Debug, Clone, Default)]
pub struct AttachmentTracker {
    pending: BTreeSet<String>,
}

impl AttachmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an image run backed by `path` left the document
    pub fn mark_removed(&mut self, path: &str) {
        debug!("Image {} pending deletion", path);
        self.pending.insert(path.to_string());
    }

    /// Record that `path` is referenced again, e.g. re-inserted
    pub fn mark_inserted(&mut self, path: &str) {
        if self.pending.remove(path) {
            debug!("Image {} referenced again", path);
        }
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.pending.contains(path)
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Delete every pending image; call only once the save has committed
    ///
    /// Never fails: a missing file is expected, any other error is logged
    /// and the committed save stands.
    pub fn flush_on_commit(&mut self, files: &dyn FileStore) -> FlushReport {
        let mut report = FlushReport::default();
        for path in std::mem::take(&mut self.pending) {
            match files.delete(&path) {
                Ok(DeleteOutcome::Deleted) => {
                    debug!("Deleted image {}", path);
                    report.deleted.push(path);
                }
                Ok(DeleteOutcome::NotFound) => {
                    warn!("Image {} already absent", path);
                    report.missing.push(path);
                }
                Err(e) => {
                    warn!("Failed to delete image {}: {}", path, e);
                    report.failed.push(path);
                }
            }
        }
        report
    }

    /// Forget pending images without touching disk
    pub fn discard(&mut self) {
        if !self.pending.is_empty() {
            debug!("Discarding {} pending image removals", self.pending.len());
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabbookError;
    use crate::storage::MockFileStore;
    use mockall::predicate::eq;

    #[test]
    fn test_flush_classifies_outcomes() {
        let mut files = MockFileStore::new();
        files
            .expect_delete()
            .with(eq("a.png"))
            .times(1)
            .returning(|_| Ok(DeleteOutcome::Deleted));
        files
            .expect_delete()
            .with(eq("b.png"))
            .times(1)
            .returning(|_| Ok(DeleteOutcome::NotFound));
        files
            .expect_delete()
            .with(eq("c.png"))
            .times(1)
            .returning(|_| Err(LabbookError::Other("permission denied".to_string())));

        let mut tracker = AttachmentTracker::new();
        for path in ["a.png", "b.png", "c.png"] {
            tracker.mark_removed(path);
        }

        let report = tracker.flush_on_commit(&files);
        assert_eq!(report.deleted, vec!["a.png"]);
        assert_eq!(report.missing, vec!["b.png"]);
        assert_eq!(report.failed, vec!["c.png"]);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_discard_never_touches_disk() {
        // No expectations: any delete call would panic
        let files = MockFileStore::new();
        let mut tracker = AttachmentTracker::new();
        tracker.mark_removed("gel.png");
        tracker.discard();

        assert!(tracker.is_empty());
        assert_eq!(tracker.flush_on_commit(&files), FlushReport::default());
    }

    #[test]
    fn test_reinserted_image_is_kept() {
        let mut tracker = AttachmentTracker::new();
        tracker.mark_removed("gel.png");
        tracker.mark_inserted("gel.png");
        assert!(!tracker.is_pending("gel.png"));
    }
}
