//! Labbook - Entity-Linked Rich-Text Editing Core
//!
//! The editing core behind lab protocols and experiments:
//! - A run-based rich-text document with atomic anchor and image runs
//! - Trigger-driven completion that turns typed words into typed links
//! - A scanner recovering the linked entities from document contents
//! - Transactional reconciliation of scanned links against a relational store
//! - Deferred deletion of images removed from a document
//!
//! # Architecture
//!
//! - **Types**: Entity kinds, anchors, owners and link sets
//! - **Document / Editor**: The document value and the keystroke state machine
//! - **Scanner / Reconcile**: Link recovery and the all-or-nothing save
//! - **Storage**: SQLite link store and directory-backed file store
//!
//! # Example
//!
//! ```ignore
//! use labbook_core::{DirectoryFileStore, EditorSettings, EntrySession, Owner, SqliteLinkStore};
//!
//! fn main() -> labbook_core::Result<()> {
//!     let mut store = SqliteLinkStore::open("labbook.db")?;
//!     let files = DirectoryFileStore::new("notebook");
//!     let owner = Owner::protocol(uuid::Uuid::new_v4());
//!
//!     let mut session = EntrySession::open(owner, &files, EditorSettings::default())?;
//!     session.refresh_candidates(&store)?;
//!     session.body_mut().type_str("Adjust the ");
//!     let report = session.save(&mut store, &files)?;
//!     println!("{} link(s) saved", report.links.len());
//!     Ok(())
//! }
//! ```

pub mod attachments;
pub mod config;
pub mod document;
pub mod editor;
pub mod entry;
pub mod error;
pub mod reconcile;
pub mod scanner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use attachments::{AttachmentTracker, FlushReport};
pub use self::config::LabbookConfig;
pub use document::{Cursor, Document, Run, StyleAttributes};
pub use editor::{Commit, CompletionState, Editor, EditorSettings, KeyOutcome};
pub use entry::EntrySession;
pub use error::{LabbookError, Result, StoreError, StoreResult};
pub use reconcile::{commit_entry, persisted_links, reconcile, save_entry, LinkDiff, SaveReport};
pub use scanner::{scan, scan_entry};
pub use storage::{DirectoryFileStore, FileStore, LinkStore, SqliteLinkStore, StoredEntry};
pub use types::{Anchor, Candidate, EntityKind, LinkSet, Owner, OwnerKind};
