//! Trigger chords and the kind table
//!
//! One table maps every entity kind to the key chord that opens a
//! completion session for it and to the candidates offered while it is
//! open. Nothing else in the editor branches on which trigger fired.

use crate::error::{LabbookError, Result};
use crate::types::{Candidate, EntityKind};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use std::str::FromStr;

/// Modifier + letter combination, written like `ctrl+t` or `ctrl+shift+r`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub modifiers: KeyModifiers,
    pub key: char,
}

impl KeyChord {
    pub fn new(modifiers: KeyModifiers, key: char) -> Self {
        Self {
            modifiers,
            key: key.to_ascii_lowercase(),
        }
    }

    pub fn ctrl(key: char) -> Self {
        Self::new(KeyModifiers::CONTROL, key)
    }

    /// Whether `event` is this chord; Shift only matters if the chord names it
    pub fn matches(&self, event: &KeyEvent) -> bool {
        let KeyCode::Char(c) = event.code else {
            return false;
        };
        if !c.eq_ignore_ascii_case(&self.key) {
            return false;
        }
        let wants_shift = self.modifiers.contains(KeyModifiers::SHIFT);
        if wants_shift && !event.modifiers.contains(KeyModifiers::SHIFT) {
            return false;
        }
        event.modifiers.difference(KeyModifiers::SHIFT) == self.modifiers.difference(KeyModifiers::SHIFT)
    }
}

impl FromStr for KeyChord {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            LabbookError::Config(config::ConfigError::Message(format!(
                "invalid trigger chord '{}'",
                s
            )))
        };

        let mut modifiers = KeyModifiers::NONE;
        let mut key = None;
        for part in s.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                letter => {
                    let mut chars = letter.chars();
                    match (chars.next(), chars.next(), key) {
                        (Some(c), None, None) if c.is_ascii_alphanumeric() => key = Some(c),
                        _ => return Err(invalid()),
                    }
                }
            }
        }

        // A bare letter would swallow ordinary typing
        if modifiers.difference(KeyModifiers::SHIFT).is_empty() {
            return Err(invalid());
        }

        key.map(|key| KeyChord::new(modifiers, key)).ok_or_else(invalid)
    }
}

impl std::fmt::Display for KeyChord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Trigger and candidate source for one kind
#[derive(Debug, Clone)]
pub struct KindEntry {
    pub trigger: KeyChord,
    pub candidates: Vec<Candidate>,
}

/// Per-kind trigger chords and candidate lists
#[derive(Debug, Clone)]
pub struct KindTable {
    entries: HashMap<EntityKind, KindEntry>,
}

impl Default for KindTable {
    fn default() -> Self {
        let entries = [
            (EntityKind::Tag, KeyChord::ctrl('t')),
            (EntityKind::Reference, KeyChord::ctrl('r')),
            (EntityKind::Dataset, KeyChord::ctrl('d')),
            (EntityKind::Protocol, KeyChord::ctrl('p')),
        ]
        .into_iter()
        .map(|(kind, trigger)| {
            let entry = KindEntry {
                trigger,
                candidates: Vec::new(),
            };
            (kind, entry)
        })
        .collect();
        Self { entries }
    }
}

impl KindTable {
    /// Build a table with empty candidate lists; chords must be distinct
    pub fn new(triggers: impl IntoIterator<Item = (EntityKind, KeyChord)>) -> Result<Self> {
        let mut entries: HashMap<EntityKind, KindEntry> = HashMap::new();
        for (kind, trigger) in triggers {
            if let Some((other, _)) = entries.iter().find(|(_, e)| e.trigger == trigger) {
                return Err(LabbookError::Config(config::ConfigError::Message(format!(
                    "trigger {} is bound to both {} and {}",
                    trigger, other, kind
                ))));
            }
            entries.insert(
                kind,
                KindEntry {
                    trigger,
                    candidates: Vec::new(),
                },
            );
        }
        Ok(Self { entries })
    }

    /// Kind whose trigger `event` is
    pub fn trigger_for(&self, event: &KeyEvent) -> Option<EntityKind> {
        EntityKind::ALL.into_iter().find(|kind| {
            self.entries
                .get(kind)
                .is_some_and(|entry| entry.trigger.matches(event))
        })
    }

    pub fn trigger(&self, kind: EntityKind) -> Option<KeyChord> {
        self.entries.get(&kind).map(|entry| entry.trigger)
    }

    pub fn candidates(&self, kind: EntityKind) -> &[Candidate] {
        self.entries
            .get(&kind)
            .map_or(&[], |entry| entry.candidates.as_slice())
    }

    /// Replace the candidates offered for `kind`
    pub fn set_candidates(&mut self, kind: EntityKind, candidates: Vec<Candidate>) {
        if let Some(entry) = self.entries.get_mut(&kind) {
            entry.candidates = candidates;
        }
    }

    /// Candidate whose key is exactly `key`
    pub fn lookup(&self, kind: EntityKind, key: &str) -> Option<&Candidate> {
        self.candidates(kind).iter().find(|candidate| candidate.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chord() {
        let chord: KeyChord = "Ctrl+Shift+R".parse().unwrap();
        assert_eq!(chord.key, 'r');
        assert!(chord.modifiers.contains(KeyModifiers::CONTROL));
        assert!(chord.modifiers.contains(KeyModifiers::SHIFT));
        assert_eq!(chord.to_string(), "ctrl+shift+r");
    }

    #[test]
    fn test_rejects_bare_and_malformed_chords() {
        assert!("t".parse::<KeyChord>().is_err());
        assert!("shift+t".parse::<KeyChord>().is_err());
        assert!("ctrl+tt".parse::<KeyChord>().is_err());
        assert!("ctrl+a+b".parse::<KeyChord>().is_err());
        assert!("ctrl".parse::<KeyChord>().is_err());
    }

    #[test]
    fn test_chord_matching() {
        let chord = KeyChord::ctrl('t');
        let event = KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL);
        assert!(chord.matches(&event));

        let plain = KeyEvent::new(KeyCode::Char('t'), KeyModifiers::NONE);
        assert!(!chord.matches(&plain));

        let alt = KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL | KeyModifiers::ALT);
        assert!(!chord.matches(&alt));
    }

    #[test]
    fn test_duplicate_triggers_rejected() {
        let result = KindTable::new([
            (EntityKind::Tag, KeyChord::ctrl('t')),
            (EntityKind::Dataset, KeyChord::ctrl('t')),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_table_routes_triggers() {
        let table = KindTable::default();
        let event = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(table.trigger_for(&event), Some(EntityKind::Dataset));
    }
}
