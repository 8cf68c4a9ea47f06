//! Link reconciliation
//!
//! Brings the persisted links of one owner in sync with the links scanned
//! from its entry. A save is all-or-nothing:
//!
//! ```text
//! Started --(diff + apply per kind, body write, commit)--> Committed
//!         --(any fatal error, rollback)-------------------> Aborted
//! ```
//!
//! Images removed from the entry are deleted only once the save has
//! committed, so an aborted save never loses a file the entry may still
//! need.

use crate::attachments::{AttachmentTracker, FlushReport};
use crate::error::{Result, StoreResult};
use crate::scanner::scan_entry;
use crate::storage::{FileStore, LinkStore, StoredEntry};
use crate::types::{EntityKind, LinkSet, Owner};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Changes applied for one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkDiff {
    pub kind: EntityKind,
    /// Join rows inserted
    pub inserted: Vec<String>,
    /// Join rows deleted
    pub deleted: Vec<String>,
    /// Tag rows deleted because no owner links them any more
    pub tags_removed: Vec<String>,
    /// Tag rows kept because another owner still links them
    pub tags_retained: Vec<String>,
}

impl LinkDiff {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            inserted: Vec::new(),
            deleted: Vec::new(),
            tags_removed: Vec::new(),
            tags_retained: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.deleted.is_empty()
    }
}

/// Apply the difference between `previous` and `current` links of `kind`
///
/// Must run inside an open transaction. An empty difference issues no
/// store calls at all.
pub fn reconcile(
    store: &mut dyn LinkStore,
    owner: &Owner,
    kind: EntityKind,
    previous: &BTreeSet<String>,
    current: &BTreeSet<String>,
) -> StoreResult<LinkDiff> {
    let mut diff = LinkDiff::new(kind);

    for identifier in current.difference(previous) {
        if kind.is_shared() {
            store.upsert_tag(identifier)?;
        }
        store.insert_link(owner, kind, identifier)?;
        diff.inserted.push(identifier.clone());
    }

    for identifier in previous.difference(current) {
        store.delete_link(owner, kind, identifier)?;
        diff.deleted.push(identifier.clone());

        if kind.is_shared() {
            match store.delete_tag(identifier) {
                Ok(()) => diff.tags_removed.push(identifier.clone()),
                Err(e) if e.is_integrity_violation() => {
                    debug!("Tag '{}' still linked elsewhere, keeping it", identifier);
                    diff.tags_retained.push(identifier.clone());
                }
                Err(e) => return Err(e),
            }
        }
    }

    if !diff.is_empty() {
        debug!(
            "Reconciled {} links of {}: +{} -{}",
            kind,
            owner,
            diff.inserted.len(),
            diff.deleted.len()
        );
    }
    Ok(diff)
}

/// Progress of one save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Started,
    Committed,
    Aborted,
}

impl std::fmt::Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SaveState::Started => "started",
            SaveState::Committed => "committed",
            SaveState::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a committed save
#[derive(Debug, Clone, Serialize)]
pub struct SaveReport {
    pub owner: Owner,
    /// One entry per entity kind, in [`EntityKind::ALL`] order
    pub diffs: Vec<LinkDiff>,
    pub links: LinkSet,
    pub attachments: FlushReport,
    pub saved_at: DateTime<Utc>,
}

impl SaveReport {
    pub fn diff(&self, kind: EntityKind) -> Option<&LinkDiff> {
        self.diffs.iter().find(|diff| diff.kind == kind)
    }

    /// Whether the save changed any link
    pub fn changed_links(&self) -> bool {
        self.diffs.iter().any(|diff| !diff.is_empty())
    }
}

/// Persist `entry` for `owner` in one transaction
///
/// Reconciles every entity kind, then writes the body blob, then commits.
/// On any failure the transaction is rolled back and, if the body had
/// already been replaced, the previous body is put back.
pub fn commit_entry(
    store: &mut dyn LinkStore,
    files: &dyn FileStore,
    owner: &Owner,
    entry: &StoredEntry,
) -> Result<(LinkSet, Vec<LinkDiff>)> {
    let current = scan_entry(&entry.body, &entry.description);
    let bytes = entry.to_bytes()?;

    store.begin()?;
    debug!("Save of {} {}", owner, SaveState::Started);

    let mut previous_body = None;
    let outcome = apply(store, files, owner, &current, &bytes, &mut previous_body);
    let outcome = outcome.and_then(|diffs| match store.commit() {
        Ok(()) => Ok(diffs),
        Err(e) => {
            if let Some(previous) = previous_body.take() {
                restore_body(files, owner, previous);
            }
            Err(e.into())
        }
    });

    match outcome {
        Ok(diffs) => {
            info!("Save of {} {}", owner, SaveState::Committed);
            Ok((current, diffs))
        }
        Err(e) => {
            if let Err(rollback_err) = store.rollback() {
                warn!("Rollback after failed save of {} failed: {}", owner, rollback_err);
            }
            warn!("Save of {} {}: {}", owner, SaveState::Aborted, e);
            Err(e)
        }
    }
}

/// Body blob as it was before this save; None inside means it did not exist
type PreviousBody = Option<Option<Vec<u8>>>;

fn apply(
    store: &mut dyn LinkStore,
    files: &dyn FileStore,
    owner: &Owner,
    current: &LinkSet,
    bytes: &[u8],
    previous_body: &mut PreviousBody,
) -> Result<Vec<LinkDiff>> {
    let mut diffs = Vec::with_capacity(EntityKind::ALL.len());
    for kind in EntityKind::ALL {
        let previous = store.select_links(owner, kind)?;
        diffs.push(reconcile(store, owner, kind, &previous, current.get(kind))?);
    }

    let existing = files.read_body(owner)?;
    files.write_body(owner, bytes)?;
    *previous_body = Some(existing);
    Ok(diffs)
}

fn restore_body(files: &dyn FileStore, owner: &Owner, previous: Option<Vec<u8>>) {
    let restored = match previous {
        Some(bytes) => files.write_body(owner, &bytes),
        None => files.remove_body(owner).map(|_| ()),
    };
    if let Err(e) = restored {
        warn!("Failed to restore previous body of {}: {}", owner, e);
    }
}

/// Commit `entry`, then flush the image removals pending in `trackers`
///
/// Images `entry` still references are never deleted. Trackers are left
/// untouched if the save aborts.
pub fn save_entry(
    store: &mut dyn LinkStore,
    files: &dyn FileStore,
    owner: &Owner,
    entry: &StoredEntry,
    trackers: &mut [&mut AttachmentTracker],
) -> Result<SaveReport> {
    let (links, diffs) = commit_entry(store, files, owner, entry)?;

    // A path may be removed in one place and still shown in another
    let referenced: BTreeSet<&str> = entry
        .description
        .image_paths()
        .chain(entry.body.image_paths())
        .collect();

    let mut attachments = FlushReport::default();
    for tracker in trackers.iter_mut() {
        for path in &referenced {
            tracker.mark_inserted(path);
        }
        let report = tracker.flush_on_commit(files);
        attachments.deleted.extend(report.deleted);
        attachments.missing.extend(report.missing);
        attachments.failed.extend(report.failed);
    }

    Ok(SaveReport {
        owner: *owner,
        diffs,
        links,
        attachments,
        saved_at: Utc::now(),
    })
}

/// Persisted links of `owner` across every kind
pub fn persisted_links(store: &dyn LinkStore, owner: &Owner) -> Result<LinkSet> {
    let mut links = LinkSet::new();
    for kind in EntityKind::ALL {
        links.extend(kind, store.select_links(owner, kind)?);
    }
    Ok(links)
}
