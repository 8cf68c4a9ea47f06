//! Entry editing session
//!
//! An entry is what a protocol or experiment owns: a description and a
//! body, each edited by its own [`Editor`]. The session loads the stored
//! entry, saves it through the reconciliation engine and keeps the
//! attachment trackers of both editors in step with the save outcome.

use crate::editor::{Editor, EditorSettings};
use crate::error::Result;
use crate::reconcile::{save_entry, SaveReport};
use crate::scanner::scan_entry;
use crate::storage::{FileStore, LinkStore, SqliteLinkStore, StoredEntry};
use crate::types::{EntityKind, LinkSet, Owner};
use std::ops::Range;
use tracing::{debug, info};

pub struct EntrySession {
    owner: Owner,
    description: Editor,
    body: Editor,
}

impl EntrySession {
    /// Session over an entry that has never been saved
    pub fn new(owner: Owner, settings: EditorSettings) -> Self {
        Self::from_entry(owner, StoredEntry::default(), settings)
    }

    pub fn from_entry(owner: Owner, entry: StoredEntry, settings: EditorSettings) -> Self {
        Self {
            owner,
            description: Editor::new(entry.description, settings.clone()),
            body: Editor::new(entry.body, settings),
        }
    }

    /// Load the stored entry of `owner`, or start empty if there is none
    pub fn open(owner: Owner, files: &dyn FileStore, settings: EditorSettings) -> Result<Self> {
        let entry = match files.read_body(&owner)? {
            Some(bytes) => StoredEntry::from_bytes(&bytes)?,
            None => {
                debug!("No stored entry for {}, starting empty", owner);
                StoredEntry::default()
            }
        };
        Ok(Self::from_entry(owner, entry, settings))
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn body(&self) -> &Editor {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Editor {
        &mut self.body
    }

    pub fn description(&self) -> &Editor {
        &self.description
    }

    pub fn description_mut(&mut self) -> &mut Editor {
        &mut self.description
    }

    /// Snapshot of both documents as they would be persisted
    pub fn entry(&self) -> StoredEntry {
        StoredEntry {
            description: self.description.document().clone(),
            body: self.body.document().clone(),
        }
    }

    /// Links the entry currently carries
    pub fn links(&self) -> LinkSet {
        scan_entry(self.body.document(), self.description.document())
    }

    /// Store `bytes` as an image of this entry and embed it at the body cursor
    pub fn attach_image(
        &mut self,
        files: &dyn FileStore,
        bytes: &[u8],
        extension: &str,
    ) -> Result<Range<usize>> {
        let path = files.write_image(&self.owner, bytes, extension)?;
        Ok(self.body.insert_image(&path))
    }

    /// Persist the entry; removed images are deleted only after commit
    ///
    /// On failure the documents are left exactly as the user left them.
    pub fn save(&mut self, store: &mut dyn LinkStore, files: &dyn FileStore) -> Result<SaveReport> {
        let entry = self.entry();
        let report = save_entry(
            store,
            files,
            &self.owner,
            &entry,
            &mut [
                self.description.attachments_mut(),
                self.body.attachments_mut(),
            ],
        )?;
        info!(
            "Saved {} with {} link(s), {} image(s) deleted",
            self.owner,
            report.links.len(),
            report.attachments.deleted.len()
        );
        Ok(report)
    }

    /// Abandon unsaved edits: pending image removals are forgotten
    pub fn discard(mut self) {
        self.description.attachments_mut().discard();
        self.body.attachments_mut().discard();
        debug!("Discarded edits of {}", self.owner);
    }

    /// Reload every candidate list from the store, e.g. after a save
    pub fn refresh_candidates(&mut self, store: &SqliteLinkStore) -> Result<()> {
        for kind in EntityKind::ALL {
            let candidates = store.load_candidates(kind)?;
            self.description.set_candidates(kind, candidates.clone());
            self.body.set_candidates(kind, candidates);
        }
        Ok(())
    }
}
