//! Entity-linking editor
//!
//! Wraps a [`Document`] with the completion state machine that turns typed
//! words into anchor runs, and with the attachment tracker that remembers
//! which embedded images the user removed.
//!
//! ```text
//! Idle --trigger--> Listening(kind) --enter/tab/separator--> Idle (commit)
//!                                   --escape/boundary------> Idle (cancel)
//! ```
//!
//! # Invariants
//!
//! - At most one session is open; a second trigger while listening is ignored
//! - Keys meant for the candidate list never reach the document
//! - Every image run removed from the document is reported to the tracker

mod completion;
mod keys;

pub use completion::{CandidateList, CompletionSession, CompletionState};
pub use keys::{KeyChord, KindEntry, KindTable};

use crate::attachments::AttachmentTracker;
use crate::document::{Deletion, Document, Movement};
use crate::types::{Anchor, Candidate, EntityKind};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use nucleo::Matcher;
use std::ops::Range;
use tracing::debug;

/// Characters that end a word, besides whitespace
pub const DEFAULT_WORD_SEPARATORS: &str = "~!@#$%^&*()+{}|:\"<>?,./;'[]\\-=";

/// Default number of candidates shown
pub const DEFAULT_MAX_CANDIDATES: usize = 10;

/// Editor behaviour resolved from configuration
#[derive(Debug, Clone)]
pub struct EditorSettings {
    pub kinds: KindTable,
    pub word_separators: String,
    pub max_candidates: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            kinds: KindTable::default(),
            word_separators: DEFAULT_WORD_SEPARATORS.to_string(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

/// Result of a completion commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub kind: EntityKind,
    /// Link created, or None when the text stayed plain
    pub anchor: Option<Anchor>,
    /// Span of the linked (or left plain) text, trailing space excluded
    pub range: Range<usize>,
}

/// What a keystroke did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Document text changed
    Edited,
    /// Cursor or selection moved
    CursorMoved,
    /// Completion session opened
    Opened(EntityKind),
    /// Session prefix changed and the list was re-filtered
    Filtered,
    /// Highlighted candidate changed
    Navigated,
    /// Session committed
    Committed(Commit),
    /// Session cancelled, typed text left plain
    Cancelled,
    /// Keystroke had no effect
    Ignored,
}

/// One open editor: document, completion session and pending image removals
pub struct Editor {
    document: Document,
    kinds: KindTable,
    word_separators: String,
    max_candidates: usize,
    session: Option<CompletionSession>,
    attachments: AttachmentTracker,
    matcher: Matcher,
}

impl Editor {
    pub fn new(document: Document, settings: EditorSettings) -> Self {
        Self {
            document,
            kinds: settings.kinds,
            word_separators: settings.word_separators,
            max_candidates: settings.max_candidates,
            session: None,
            attachments: AttachmentTracker::new(),
            matcher: Matcher::new(nucleo::Config::DEFAULT),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self) -> CompletionState {
        match &self.session {
            Some(session) => CompletionState::Listening(session.kind),
            None => CompletionState::Idle,
        }
    }

    pub fn session(&self) -> Option<&CompletionSession> {
        self.session.as_ref()
    }

    /// Candidates currently offered, empty when idle
    pub fn visible_candidates(&self) -> &[Candidate] {
        self.session
            .as_ref()
            .map_or(&[], |session| session.list.matches())
    }

    /// Replace the candidate source for `kind`, e.g. after a save
    pub fn set_candidates(&mut self, kind: EntityKind, candidates: Vec<Candidate>) {
        self.kinds.set_candidates(kind, candidates);
    }

    pub fn attachments(&self) -> &AttachmentTracker {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentTracker {
        &mut self.attachments
    }

    pub fn set_cursor(&mut self, position: usize) {
        self.document.set_cursor(position);
    }

    pub fn select(&mut self, range: Range<usize>) {
        self.document.select(range);
    }

    /// Insert an image run backed by `path` at the cursor
    pub fn insert_image(&mut self, path: &str) -> Range<usize> {
        self.replace_selection();
        self.attachments.mark_inserted(path);
        self.document.insert_image(path)
    }

    /// Feed every character of `text` through [`Editor::handle_key`]
    pub fn type_str(&mut self, text: &str) {
        for c in text.chars() {
            let code = if c == '\n' {
                KeyCode::Enter
            } else {
                KeyCode::Char(c)
            };
            self.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
        }
    }

    /// Process one key event
    pub fn handle_key(&mut self, event: KeyEvent) -> KeyOutcome {
        if event.kind == KeyEventKind::Release {
            return KeyOutcome::Ignored;
        }
        if let Some(kind) = self.kinds.trigger_for(&event) {
            return self.on_trigger(kind);
        }
        match self.session.take() {
            Some(session) => self.on_listening_key(session, event),
            None => self.on_idle_key(event),
        }
    }

    fn on_trigger(&mut self, kind: EntityKind) -> KeyOutcome {
        if let Some(session) = &self.session {
            debug!(
                "Ignoring {} trigger while a {} session is open",
                kind, session.kind
            );
            return KeyOutcome::Ignored;
        }

        if let Some(selection) = self.document.selection() {
            let text = self.document.text_range(selection.clone());
            let linkable = !self.document.touches_atomic(&selection)
                && !text.chars().any(|c| self.is_separator(c));
            if linkable {
                debug!("Linking selected text '{}' as {}", text, kind);
                let mut session = CompletionSession::new(kind, selection.start);
                session.candidate_prefix = text;
                self.document.set_cursor(selection.end);
                return KeyOutcome::Committed(self.commit(session, None));
            }
            self.document.set_cursor(selection.end);
        }

        let start = self.document.insertion_point(self.document.cursor().position);
        self.document.set_cursor(start);

        let mut session = CompletionSession::new(kind, start);
        session.list = CandidateList::filter(
            &mut self.matcher,
            "",
            self.kinds.candidates(kind),
            self.max_candidates,
        );
        debug!(
            "Opened {} completion at {} with {} candidates",
            kind,
            start,
            session.list.matches().len()
        );
        self.session = Some(session);
        KeyOutcome::Opened(kind)
    }

    fn on_listening_key(&mut self, mut session: CompletionSession, event: KeyEvent) -> KeyOutcome {
        match event.code {
            KeyCode::Esc => {
                debug!("Cancelled {} completion", session.kind);
                KeyOutcome::Cancelled
            }
            KeyCode::Enter | KeyCode::Tab => {
                let chosen = session.list.selected().cloned();
                KeyOutcome::Committed(self.commit(session, chosen))
            }
            KeyCode::Up => {
                session.list.select_previous();
                self.session = Some(session);
                KeyOutcome::Navigated
            }
            KeyCode::Down => {
                session.list.select_next();
                self.session = Some(session);
                KeyOutcome::Navigated
            }
            KeyCode::Left
            | KeyCode::Right
            | KeyCode::Home
            | KeyCode::End
            | KeyCode::PageUp
            | KeyCode::PageDown => {
                self.session = Some(session);
                KeyOutcome::Ignored
            }
            KeyCode::Backspace | KeyCode::Delete if self.document.selection().is_some() => {
                debug!("Deleting a selection ends the {} session", session.kind);
                self.on_idle_key(event)
            }
            KeyCode::Backspace => {
                let position = self.document.cursor().position;
                if position <= session.anchor_start {
                    debug!("Backspace at {} boundary ends the session", session.kind);
                    return self.on_idle_key(event);
                }
                self.delete(position - 1..position);
                session.candidate_prefix.pop();
                self.refilter(&mut session);
                self.session = Some(session);
                KeyOutcome::Filtered
            }
            _ => match printable(&event) {
                Some(c) if self.is_separator(c) => {
                    if session.kind == EntityKind::Tag && !session.candidate_prefix.is_empty() {
                        return KeyOutcome::Committed(self.commit(session, None));
                    }
                    debug!("Separator ends {} session without a link", session.kind);
                    self.on_idle_key(event)
                }
                Some(c) => {
                    self.document.insert_text(c.encode_utf8(&mut [0; 4]));
                    session.candidate_prefix.push(c);
                    self.refilter(&mut session);
                    self.session = Some(session);
                    KeyOutcome::Filtered
                }
                None => {
                    self.session = Some(session);
                    KeyOutcome::Ignored
                }
            },
        }
    }

    fn on_idle_key(&mut self, event: KeyEvent) -> KeyOutcome {
        let extend = event.modifiers.contains(KeyModifiers::SHIFT);
        match event.code {
            KeyCode::Backspace => {
                if let Some(selection) = self.document.selection() {
                    self.delete(selection);
                    return KeyOutcome::Edited;
                }
                let position = self.document.cursor().position;
                if position == 0 {
                    return KeyOutcome::Ignored;
                }
                self.delete(position - 1..position);
                KeyOutcome::Edited
            }
            KeyCode::Delete => {
                if let Some(selection) = self.document.selection() {
                    self.delete(selection);
                    return KeyOutcome::Edited;
                }
                let position = self.document.cursor().position;
                if position >= self.document.len() {
                    return KeyOutcome::Ignored;
                }
                self.delete(position..position + 1);
                KeyOutcome::Edited
            }
            KeyCode::Enter => self.type_text("\n"),
            KeyCode::Tab => self.type_text("\t"),
            KeyCode::Left => self.move_cursor(Movement::Left, extend),
            KeyCode::Right => self.move_cursor(Movement::Right, extend),
            KeyCode::Home => self.move_cursor(Movement::LineStart, extend),
            KeyCode::End => self.move_cursor(Movement::LineEnd, extend),
            KeyCode::PageUp => self.move_cursor(Movement::DocumentStart, extend),
            KeyCode::PageDown => self.move_cursor(Movement::DocumentEnd, extend),
            _ => match printable(&event) {
                Some(c) => self.type_text(c.encode_utf8(&mut [0; 4])),
                None => KeyOutcome::Ignored,
            },
        }
    }

    /// Turn the session's typed span into a link, or leave it plain
    fn commit(&mut self, session: CompletionSession, chosen: Option<Candidate>) -> Commit {
        let kind = session.kind;
        let span = session.anchor_start..self.document.cursor().position;
        let key = chosen.map_or(session.candidate_prefix, |candidate| candidate.key);

        let resolved = match kind {
            EntityKind::Tag if key.is_empty() => None,
            EntityKind::Tag => Some((key.replace('_', " "), Anchor::new(kind, key.as_str()))),
            _ => self.kinds.lookup(kind, &key).map(|candidate| {
                (
                    candidate.display_name.clone(),
                    Anchor::new(kind, candidate.identifier.as_str()),
                )
            }),
        };

        match resolved {
            Some((display, anchor)) => {
                let deletion = self.delete(span);
                self.document.set_cursor(deletion.range.start);
                let range = self.document.insert_anchor_run(&display, anchor.clone());
                self.document.insert_text(" ");
                debug!("Linked {} over {:?}", anchor, range);
                Commit {
                    kind,
                    anchor: Some(anchor),
                    range,
                }
            }
            None => {
                if !span.is_empty() {
                    self.document.set_cursor(span.end);
                    self.document.insert_text(" ");
                }
                debug!("No {} candidate for '{}', text stays plain", kind, key);
                Commit {
                    kind,
                    anchor: None,
                    range: span,
                }
            }
        }
    }

    fn refilter(&mut self, session: &mut CompletionSession) {
        session.list = CandidateList::filter(
            &mut self.matcher,
            &session.candidate_prefix,
            self.kinds.candidates(session.kind),
            self.max_candidates,
        );
    }

    fn type_text(&mut self, text: &str) -> KeyOutcome {
        self.replace_selection();
        self.document.insert_text(text);
        KeyOutcome::Edited
    }

    fn move_cursor(&mut self, movement: Movement, extend: bool) -> KeyOutcome {
        self.document.move_cursor(movement, extend);
        KeyOutcome::CursorMoved
    }

    fn replace_selection(&mut self) {
        if let Some(selection) = self.document.selection() {
            self.delete(selection);
        }
    }

    /// Delete through the document, reporting removed images
    fn delete(&mut self, range: Range<usize>) -> Deletion {
        let deletion = self.document.delete_range(range);
        for path in deletion.removed_images() {
            self.attachments.mark_removed(path);
        }
        deletion
    }

    fn is_separator(&self, c: char) -> bool {
        c.is_whitespace() || self.word_separators.contains(c)
    }
}

/// Character a key event types, if any
fn printable(event: &KeyEvent) -> Option<char> {
    match event.code {
        KeyCode::Char(c) if event.modifiers.difference(KeyModifiers::SHIFT).is_empty() => Some(c),
        _ => None,
    }
}
