//! Rich-text document model
//!
//! A document is an ordered sequence of styled runs plus an explicit cursor.
//! Positions are character offsets from the start of the document.
//!
//! # Invariants
//!
//! - No run is empty, and no two adjacent non-atomic runs share a style
//! - Anchor and image runs are atomic: deletion or restyling that touches
//!   any of their characters covers the whole run, and insertion strictly
//!   inside one lands at its end
//! - Text inserted through [`Document::insert_text`] never inherits an
//!   anchor or image from its neighbour

mod cursor;
mod run;

pub use cursor::{Cursor, Movement};
pub use run::{
    ListStyle, Rgb, Run, StyleAttributes, VerticalAlign, Weight, ANCHOR_TINT, OBJECT_REPLACEMENT,
};

use crate::types::Anchor;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Runs removed by a deletion, with the span actually deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deletion {
    /// Span deleted, after widening over atomic runs
    pub range: Range<usize>,
    /// Removed runs, in document order
    pub removed: Vec<Run>,
}

impl Deletion {
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Backing files of image runs that were removed
    pub fn removed_images(&self) -> impl Iterator<Item = &str> {
        self.removed.iter().filter_map(Run::image_path)
    }
}

/// Styled text with a cursor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    runs: Vec<Run>,

    #[serde(skip)]
    cursor: Cursor,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from runs, normalizing them
    pub fn from_runs(runs: impl IntoIterator<Item = Run>) -> Self {
        let mut document = Self {
            runs: runs.into_iter().collect(),
            cursor: Cursor::default(),
        };
        document.normalize();
        document
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_runs([Run::plain(text)])
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Move the cursor, dropping any selection
    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = Cursor::at(position.min(self.len()));
    }

    /// Select `range`, leaving the cursor at its end
    pub fn select(&mut self, range: Range<usize>) {
        let len = self.len();
        self.cursor = Cursor {
            position: range.end.min(len),
            mark: Some(range.start.min(len)),
        };
    }

    pub fn selection(&self) -> Option<Range<usize>> {
        self.cursor.selection_range()
    }

    pub fn clear_selection(&mut self) {
        self.cursor.clear_selection();
    }

    /// Iterate runs in order; every call starts over from the first run
    pub fn iterate_runs(&self) -> std::slice::Iter<'_, Run> {
        self.runs.iter()
    }

    /// Iterate runs together with the span each one covers
    pub fn spans(&self) -> impl Iterator<Item = (Range<usize>, &Run)> + '_ {
        let mut start = 0;
        self.runs.iter().map(move |run| {
            let end = start + run.len();
            let span = start..end;
            start = end;
            (span, run)
        })
    }

    /// Run containing the character at `position`
    pub fn run_at(&self, position: usize) -> Option<(Range<usize>, &Run)> {
        self.spans().find(|(span, _)| span.contains(&position))
    }

    /// Style of the character at `position`
    pub fn style_at(&self, position: usize) -> Option<&StyleAttributes> {
        self.run_at(position).map(|(_, run)| &run.style)
    }

    /// Span of the atomic run containing the character at `position`
    pub fn atomic_span_at(&self, position: usize) -> Option<Range<usize>> {
        self.run_at(position)
            .filter(|(_, run)| run.is_atomic())
            .map(|(span, _)| span)
    }

    /// Widen `range` so it never cuts through an atomic run
    pub fn expand_to_atomic(&self, range: Range<usize>) -> Range<usize> {
        if range.is_empty() {
            return range;
        }
        let start = self
            .atomic_span_at(range.start)
            .map_or(range.start, |span| span.start);
        let end = self
            .atomic_span_at(range.end - 1)
            .map_or(range.end, |span| span.end);
        start..end
    }

    /// Whole document as plain text
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Plain text of `range`
    pub fn text_range(&self, range: Range<usize>) -> String {
        self.plain_text()
            .chars()
            .skip(range.start)
            .take(range.len())
            .collect()
    }

    /// Paths of every image the document still shows
    pub fn image_paths(&self) -> impl Iterator<Item = &str> {
        self.runs.iter().filter_map(Run::image_path)
    }

    /// Whether `range` overlaps an atomic run
    pub fn touches_atomic(&self, range: &Range<usize>) -> bool {
        self.spans()
            .any(|(span, run)| run.is_atomic() && span.start < range.end && range.start < span.end)
    }

    /// Style newly typed text at `position` takes: the preceding character's
    /// formatting, forked so it is never a link or an image
    pub fn insertion_style(&self, position: usize) -> StyleAttributes {
        let source = if position > 0 {
            self.style_at(position - 1)
        } else {
            self.style_at(0)
        };
        source.map(StyleAttributes::forked).unwrap_or_default()
    }

    /// Insert plain text at the cursor
    pub fn insert_text(&mut self, text: &str) -> Range<usize> {
        let position = self.insertion_point(self.cursor.position);
        let style = self.insertion_style(position);
        self.insert_at_cursor(Run::new(text, style))
    }

    /// Insert `text` as one anchor run at the cursor
    pub fn insert_anchor_run(&mut self, text: &str, anchor: Anchor) -> Range<usize> {
        let position = self.insertion_point(self.cursor.position);
        let style = self.insertion_style(position).anchored(anchor);
        self.insert_at_cursor(Run::new(text, style))
    }

    /// Insert an image run backed by `path` at the cursor
    pub fn insert_image(&mut self, path: &str) -> Range<usize> {
        let position = self.insertion_point(self.cursor.position);
        let mut style = self.insertion_style(position);
        style.image = Some(path.to_string());
        self.insert_at_cursor(Run::new(OBJECT_REPLACEMENT.to_string(), style))
    }

    fn insert_at_cursor(&mut self, run: Run) -> Range<usize> {
        let inserted = self.insert_run(self.cursor.position, run);
        self.cursor = Cursor::at(inserted.end);
        inserted
    }

    /// Insert `run` at `position`, moved to the end of any atomic run it
    /// would otherwise split
    pub fn insert_run(&mut self, position: usize, run: Run) -> Range<usize> {
        let position = self.insertion_point(position);
        let len = run.len();
        if len == 0 {
            return position..position;
        }

        let index = self.split_at(position);
        self.runs.insert(index, run);
        self.normalize();

        if self.cursor.position > position {
            self.cursor.position += len;
        }
        self.cursor.mark = None;
        position..position + len
    }

    /// Delete `range`, widened over any atomic run it touches
    pub fn delete_range(&mut self, range: Range<usize>) -> Deletion {
        let len = self.len();
        let range = range.start.min(len)..range.end.min(len);
        let range = self.expand_to_atomic(range);
        if range.is_empty() {
            return Deletion {
                range,
                removed: Vec::new(),
            };
        }

        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        let removed: Vec<Run> = self.runs.drain(first..last).collect();
        self.normalize();

        let position = self.cursor.position;
        self.cursor = Cursor::at(if position >= range.end {
            position - range.len()
        } else if position > range.start {
            range.start
        } else {
            position
        });

        Deletion { range, removed }
    }

    /// Apply formatting to `range`
    ///
    /// Anchors and images already present are kept; the range is widened
    /// over atomic runs so a link is restyled as a whole.
    pub fn set_style(&mut self, range: Range<usize>, style: &StyleAttributes) {
        let len = self.len();
        let range = self.expand_to_atomic(range.start.min(len)..range.end.min(len));
        if range.is_empty() {
            return;
        }

        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        for run in &mut self.runs[first..last] {
            let anchor = run.style.anchor.take();
            let image = run.style.image.take();
            let mut restyled = style.forked();
            restyled.image = image;
            run.style = match anchor {
                Some(anchor) => restyled.anchored(anchor),
                None => restyled,
            };
        }
        self.normalize();
    }

    /// Move the cursor; `extend` grows the selection instead of dropping it
    pub fn move_cursor(&mut self, movement: Movement, extend: bool) {
        if extend {
            if self.cursor.mark.is_none() {
                self.cursor.start_selection();
            }
        } else {
            self.cursor.clear_selection();
        }

        let position = self.cursor.position;
        self.cursor.position = match movement {
            Movement::Left => position.saturating_sub(1),
            Movement::Right => (position + 1).min(self.len()),
            Movement::LineStart => self.line_start(position),
            Movement::LineEnd => self.line_end(position),
            Movement::DocumentStart => 0,
            Movement::DocumentEnd => self.len(),
        };
    }

    fn line_start(&self, position: usize) -> usize {
        let chars: Vec<char> = self.plain_text().chars().collect();
        chars[..position.min(chars.len())]
            .iter()
            .rposition(|c| *c == '\n')
            .map_or(0, |newline| newline + 1)
    }

    fn line_end(&self, position: usize) -> usize {
        let chars: Vec<char> = self.plain_text().chars().collect();
        let position = position.min(chars.len());
        chars[position..]
            .iter()
            .position(|c| *c == '\n')
            .map_or(chars.len(), |offset| position + offset)
    }

    /// Where text meant for `position` actually goes
    pub fn insertion_point(&self, position: usize) -> usize {
        let position = position.min(self.len());
        match self.atomic_span_at(position) {
            Some(span) if span.start < position => span.end,
            _ => position,
        }
    }

    /// Ensure a run boundary at `position`; returns the index of the run
    /// starting there
    fn split_at(&mut self, position: usize) -> usize {
        let mut start = 0;
        for index in 0..self.runs.len() {
            let len = self.runs[index].len();
            if position == start {
                return index;
            }
            if position < start + len {
                let run = &mut self.runs[index];
                let byte = run
                    .text
                    .char_indices()
                    .nth(position - start)
                    .map_or(run.text.len(), |(byte, _)| byte);
                let tail = Run::new(run.text.split_off(byte), run.style.clone());
                self.runs.insert(index + 1, tail);
                return index + 1;
            }
            start += len;
        }
        self.runs.len()
    }

    fn normalize(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        for run in runs.into_iter().filter(|run| !run.is_empty()) {
            match self.runs.last_mut() {
                Some(last) if last.can_merge(&run) => last.text.push_str(&run.text),
                _ => self.runs.push(run),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityKind;

    fn tag(name: &str) -> Anchor {
        Anchor::new(EntityKind::Tag, name)
    }

    /// "Wash Acid_Wash then rinse" with the tag spanning [5, 14)
    fn washed() -> Document {
        Document::from_runs([
            Run::plain("Wash "),
            Run::anchored("Acid_Wash", tag("Acid_Wash")),
            Run::plain(" then rinse"),
        ])
    }

    #[test]
    fn test_from_runs_merges_plain_neighbours() {
        let doc = Document::from_runs([Run::plain("ab"), Run::plain(""), Run::plain("cd")]);
        assert_eq!(doc.iterate_runs().count(), 1);
        assert_eq!(doc.plain_text(), "abcd");
    }

    #[test]
    fn test_iterate_runs_is_restartable() {
        let doc = washed();
        let first: Vec<_> = doc.iterate_runs().map(|run| run.text.clone()).collect();
        let second: Vec<_> = doc.iterate_runs().map(|run| run.text.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_run_at_and_style_at() {
        let doc = washed();
        let (span, run) = doc.run_at(7).unwrap();
        assert_eq!(span, 5..14);
        assert_eq!(run.anchor(), Some(&tag("Acid_Wash")));
        assert!(doc.style_at(2).unwrap().anchor.is_none());
        assert!(doc.run_at(doc.len()).is_none());
    }

    #[test]
    fn test_delete_inside_anchor_removes_whole_run() {
        let mut doc = washed();
        let deletion = doc.delete_range(7..8);
        assert_eq!(deletion.range, 5..14);
        assert_eq!(doc.plain_text(), "Wash  then rinse");
        assert!(doc.iterate_runs().all(|run| run.anchor().is_none()));
    }

    #[test]
    fn test_delete_range_widens_both_ends() {
        let mut doc = washed();
        let deletion = doc.delete_range(2..9);
        assert_eq!(deletion.range, 2..14);
        assert_eq!(doc.plain_text(), "Wa then rinse");
    }

    #[test]
    fn test_delete_adjusts_cursor() {
        let mut doc = washed();
        doc.set_cursor(20);
        doc.delete_range(0..5);
        assert_eq!(doc.cursor().position, 15);
    }

    #[test]
    fn test_insert_after_anchor_is_plain() {
        let mut doc = Document::from_runs([Run::anchored("pH", tag("pH"))]);
        doc.set_cursor(2);
        doc.insert_text("7");

        let runs: Vec<_> = doc.iterate_runs().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].text, "7");
        assert!(runs[1].style.anchor.is_none());
        assert!(runs[1].style.background.is_none());
    }

    #[test]
    fn test_insert_inside_anchor_lands_after_it() {
        let mut doc = washed();
        doc.set_cursor(8);
        let inserted = doc.insert_text("!");
        assert_eq!(inserted, 14..15);
        assert_eq!(doc.plain_text(), "Wash Acid_Wash! then rinse");
        assert_eq!(doc.run_at(5).unwrap().0, 5..14);
    }

    #[test]
    fn test_insert_keeps_formatting() {
        let bold = StyleAttributes {
            weight: Weight::Bold,
            ..StyleAttributes::default()
        };
        let mut doc = Document::from_runs([Run::new("Bold", bold)]);
        doc.set_cursor(4);
        doc.insert_text("er");
        assert_eq!(doc.iterate_runs().count(), 1);
        assert_eq!(doc.style_at(5).unwrap().weight, Weight::Bold);
    }

    #[test]
    fn test_adjacent_anchors_stay_separate() {
        let mut doc = Document::new();
        doc.insert_anchor_run("pH", tag("pH"));
        doc.insert_anchor_run("pH", tag("pH"));
        assert_eq!(doc.iterate_runs().count(), 2);

        doc.delete_range(0..1);
        assert_eq!(doc.plain_text(), "pH");
    }

    #[test]
    fn test_set_style_keeps_anchor() {
        let mut doc = washed();
        let italic = StyleAttributes {
            italic: true,
            ..StyleAttributes::default()
        };
        doc.set_style(0..7, &italic);

        let (span, run) = doc.run_at(6).unwrap();
        assert_eq!(span, 5..14);
        assert!(run.style.italic);
        assert_eq!(run.anchor(), Some(&tag("Acid_Wash")));
        assert!(doc.style_at(0).unwrap().italic);
        assert!(!doc.style_at(15).unwrap().italic);
    }

    #[test]
    fn test_delete_reports_removed_images() {
        let mut doc = Document::from_text("a");
        doc.set_cursor(1);
        doc.insert_image("res/figure.png");
        doc.insert_text("b");

        let deletion = doc.delete_range(0..3);
        let images: Vec<_> = deletion.removed_images().collect();
        assert_eq!(images, vec!["res/figure.png"]);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_image_paths_lists_every_copy() {
        let doc = Document::from_runs([
            Run::image("res/gel.png"),
            Run::plain("then"),
            Run::image("res/gel.png"),
        ]);
        let paths: Vec<_> = doc.image_paths().collect();
        assert_eq!(paths, vec!["res/gel.png", "res/gel.png"]);
    }

    #[test]
    fn test_touches_atomic() {
        let doc = washed();
        assert!(doc.touches_atomic(&(5..7)));
        assert!(doc.touches_atomic(&(3..6)));
        assert!(doc.touches_atomic(&(13..16)));
        assert!(!doc.touches_atomic(&(0..5)));
        assert!(!doc.touches_atomic(&(14..18)));
    }

    #[test]
    fn test_line_movement() {
        let mut doc = Document::from_text("one\ntwo\nthree");
        doc.set_cursor(5);
        doc.move_cursor(Movement::LineStart, false);
        assert_eq!(doc.cursor().position, 4);
        doc.move_cursor(Movement::LineEnd, true);
        assert_eq!(doc.selection(), Some(4..7));
    }

    #[test]
    fn test_serde_round_trip_keeps_anchor_encoding() {
        let doc = washed();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"anchor\":\"tag/Acid_Wash\""));

        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back.plain_text(), doc.plain_text());
        assert_eq!(back.run_at(5).unwrap().1.anchor(), Some(&tag("Acid_Wash")));
    }
}
