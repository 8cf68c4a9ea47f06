//! Styled runs and their character-level attributes

use crate::types::Anchor;
use serde::{Deserialize, Serialize};

/// Character standing in for an embedded image
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Background applied to anchor runs so links stand out from plain text
pub const ANCHOR_TINT: Rgb = Rgb(220, 232, 250);

/// RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Font weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    #[default]
    Normal,
    Bold,
}

/// Vertical alignment of glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

/// List a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStyle {
    Bullet,
    Numbered,
}

/// Character-level attributes shared by every character of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleAttributes {
    #[serde(skip_serializing_if = "is_default")]
    pub weight: Weight,
    #[serde(skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub strike: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub vertical_align: VerticalAlign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListStyle>,
    /// Link carried by the run, serialized as `<kind>/<identifier>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    /// Backing file of an embedded image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

impl StyleAttributes {
    pub fn plain() -> Self {
        Self::default()
    }

    /// Same formatting carrying `anchor`, tinted
    pub fn anchored(&self, anchor: Anchor) -> Self {
        let mut style = self.forked();
        style.anchor = Some(anchor);
        style.background = Some(ANCHOR_TINT);
        style
    }

    /// Formatting for text typed after this run: never a link or an image
    pub fn forked(&self) -> Self {
        let mut style = self.clone();
        if style.anchor.take().is_some() && style.background == Some(ANCHOR_TINT) {
            style.background = None;
        }
        style.image = None;
        style
    }

    /// Anchor and image runs are deleted and edited as a whole
    pub fn is_atomic(&self) -> bool {
        self.anchor.is_some() || self.image.is_some()
    }
}

/// Contiguous text sharing one set of attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub style: StyleAttributes,
}

impl Run {
    pub fn new(text: impl Into<String>, style: StyleAttributes) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, StyleAttributes::plain())
    }

    pub fn anchored(text: impl Into<String>, anchor: Anchor) -> Self {
        Self::new(text, StyleAttributes::plain().anchored(anchor))
    }

    pub fn image(path: impl Into<String>) -> Self {
        let style = StyleAttributes {
            image: Some(path.into()),
            ..StyleAttributes::default()
        };
        Self::new(OBJECT_REPLACEMENT.to_string(), style)
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_atomic(&self) -> bool {
        self.style.is_atomic()
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        self.style.anchor.as_ref()
    }

    pub fn image_path(&self) -> Option<&str> {
        self.style.image.as_deref()
    }

    /// Whether `next` may be folded into this run
    pub(crate) fn can_merge(&self, next: &Run) -> bool {
        !self.is_atomic() && !next.is_atomic() && self.style == next.style
    }
}
