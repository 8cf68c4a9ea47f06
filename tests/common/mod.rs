//! Common test utilities and helpers

#![allow(dead_code)]

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use labbook_core::{
    Candidate, DirectoryFileStore, EditorSettings, EntityKind, EntrySession, Owner,
    SqliteLinkStore,
};
use std::ops::Range;
use tempfile::TempDir;
use uuid::Uuid;

/// Link store and file store sharing one temporary directory
pub struct TestNotebook {
    pub store: SqliteLinkStore,
    pub files: DirectoryFileStore,
    temp_dir: TempDir,
}

impl TestNotebook {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteLinkStore::open(temp_dir.path().join("labbook.db"))
            .expect("Failed to open test link store");
        let files = DirectoryFileStore::new(temp_dir.path().join("notebook"));
        Self {
            store,
            files,
            temp_dir,
        }
    }

    /// Absolute location of a path handed out by the file store
    pub fn file_exists(&self, relative: &str) -> bool {
        self.files
            .resolve(relative)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    /// Register a reference and return its identifier
    pub fn add_reference(&self, cite_key: &str, title: &str) -> String {
        let id = Uuid::new_v4();
        self.store
            .create_reference(id, cite_key, title)
            .expect("Failed to create reference");
        id.to_string()
    }

    /// Open a session for `owner` with candidates loaded from the store
    pub fn open(&self, owner: Owner) -> EntrySession {
        let mut session = EntrySession::open(owner, &self.files, EditorSettings::default())
            .expect("Failed to open entry");
        session
            .refresh_candidates(&self.store)
            .expect("Failed to load candidates");
        session
    }
}

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

pub fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

/// Settings with the given candidates installed for `kind`
pub fn settings_with(kind: EntityKind, candidates: Vec<Candidate>) -> EditorSettings {
    let mut settings = EditorSettings::default();
    settings.kinds.set_candidates(kind, candidates);
    settings
}

/// Span of the first anchor run of `kind` in the session body
pub fn anchor_span(session: &EntrySession, kind: EntityKind) -> Option<Range<usize>> {
    session
        .body()
        .document()
        .spans()
        .find(|(_, run)| run.anchor().is_some_and(|anchor| anchor.kind == kind))
        .map(|(range, _)| range)
}
