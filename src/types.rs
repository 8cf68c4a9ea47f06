//! Core data types for the Labbook editing core
//!
//! Defines the entity kinds that documents can link to, the stable
//! `<kind>/<identifier>` anchor encoding carried inside styled runs, the
//! owners of those links (protocols and experiments), and the per-kind
//! link sets that flow from the scanner into reconciliation.

use crate::error::{LabbookError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of entity a document can link to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Free-form tag, identified by its name
    Tag,

    /// Bibliographic reference, identified by UUID
    Reference,

    /// Dataset, identified by UUID
    Dataset,

    /// Protocol, identified by UUID
    Protocol,
}

impl EntityKind {
    /// Every kind, in reconciliation order
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Tag,
        EntityKind::Reference,
        EntityKind::Dataset,
        EntityKind::Protocol,
    ];

    /// Segment used in the anchor encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Tag => "tag",
            EntityKind::Reference => "reference",
            EntityKind::Dataset => "dataset",
            EntityKind::Protocol => "protocol",
        }
    }

    /// Tags are shared entities created and removed implicitly by linking
    pub fn is_shared(&self) -> bool {
        matches!(self, EntityKind::Tag)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tag" => Ok(EntityKind::Tag),
            "reference" => Ok(EntityKind::Reference),
            "dataset" => Ok(EntityKind::Dataset),
            "protocol" => Ok(EntityKind::Protocol),
            other => Err(LabbookError::InvalidAnchor(format!(
                "unknown entity kind '{}'",
                other
            ))),
        }
    }
}

/// Link from a run to an entity, encoded as `<kind>/<identifier>`
///
/// The encoding is stable: previously saved documents carry it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Anchor {
    pub kind: EntityKind,
    pub identifier: String,
}

impl Anchor {
    pub fn new(kind: EntityKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }

    /// Render the `<kind>/<identifier>` form
    pub fn encode(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.identifier)
    }

    /// Parse the `<kind>/<identifier>` form
    ///
    /// Splits on the first slash; the identifier must be non-empty.
    pub fn parse(encoded: &str) -> Result<Self> {
        let (kind, identifier) = encoded
            .split_once('/')
            .ok_or_else(|| LabbookError::InvalidAnchor(encoded.to_string()))?;

        if identifier.is_empty() {
            return Err(LabbookError::InvalidAnchor(encoded.to_string()));
        }

        Ok(Self {
            kind: kind.parse()?,
            identifier: identifier.to_string(),
        })
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.identifier)
    }
}

impl FromStr for Anchor {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Anchor {
    type Error = LabbookError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Anchor> for String {
    fn from(anchor: Anchor) -> Self {
        anchor.encode()
    }
}

/// Kind of document that owns links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Protocol,
    Experiment,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Protocol => "protocol",
            OwnerKind::Experiment => "experiment",
        }
    }
}

impl std::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerKind {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "protocol" => Ok(OwnerKind::Protocol),
            "experiment" => Ok(OwnerKind::Experiment),
            other => Err(LabbookError::InvalidOwner(format!(
                "unknown owner kind '{}'",
                other
            ))),
        }
    }
}

/// Protocol or experiment whose body and description carry links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: Uuid,
}

impl Owner {
    pub fn new(kind: OwnerKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    pub fn protocol(id: Uuid) -> Self {
        Self::new(OwnerKind::Protocol, id)
    }

    pub fn experiment(id: Uuid) -> Self {
        Self::new(OwnerKind::Experiment, id)
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Identifiers referenced by one owner, one set per entity kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSet {
    pub tags: BTreeSet<String>,
    pub references: BTreeSet<String>,
    pub datasets: BTreeSet<String>,
    pub protocols: BTreeSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers for one kind
    pub fn get(&self, kind: EntityKind) -> &BTreeSet<String> {
        match kind {
            EntityKind::Tag => &self.tags,
            EntityKind::Reference => &self.references,
            EntityKind::Dataset => &self.datasets,
            EntityKind::Protocol => &self.protocols,
        }
    }

    fn get_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<String> {
        match kind {
            EntityKind::Tag => &mut self.tags,
            EntityKind::Reference => &mut self.references,
            EntityKind::Dataset => &mut self.datasets,
            EntityKind::Protocol => &mut self.protocols,
        }
    }

    /// Add one identifier; returns false if it was already present
    pub fn insert(&mut self, kind: EntityKind, identifier: impl Into<String>) -> bool {
        self.get_mut(kind).insert(identifier.into())
    }

    /// Merge another set of identifiers for one kind
    pub fn extend(&mut self, kind: EntityKind, identifiers: impl IntoIterator<Item = String>) {
        self.get_mut(kind).extend(identifiers);
    }

    pub fn contains(&self, kind: EntityKind, identifier: &str) -> bool {
        self.get(kind).contains(identifier)
    }

    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|kind| self.get(*kind).is_empty())
    }

    /// Total number of links across kinds
    pub fn len(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.get(*kind).len()).sum()
    }
}

/// Completion candidate supplied by the caller for one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Text matched against what the user typed
    pub key: String,

    /// Text shown in the document once linked
    pub display_name: String,

    /// Canonical identifier stored in the anchor
    pub identifier: String,
}

impl Candidate {
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            identifier: identifier.into(),
        }
    }

    /// Tags are their own key, display name and identifier
    pub fn tag(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            display_name: name.clone(),
            identifier: name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_anchor_parse() {
        let anchor = Anchor::parse("reference/3f2a").unwrap();
        assert_eq!(anchor.kind, EntityKind::Reference);
        assert_eq!(anchor.identifier, "3f2a");
    }

    #[test]
    fn test_only_tags_are_shared() {
        let shared: Vec<_> = EntityKind::ALL
            .into_iter()
            .filter(EntityKind::is_shared)
            .collect();
        assert_eq!(shared, vec![EntityKind::Tag]);
    }

    #[test]
    fn test_anchor_rejects_malformed() {
        assert!(Anchor::parse("tag").is_err());
        assert!(Anchor::parse("tag/").is_err());
        assert!(Anchor::parse("sample/abc").is_err());
    }

    #[test]
    fn test_anchor_serializes_as_string() {
        let anchor = Anchor::new(EntityKind::Tag, "pH");
        let json = serde_json::to_string(&anchor).unwrap();
        assert_eq!(json, "\"tag/pH\"");

        let back: Anchor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, anchor);
    }

    #[test]
    fn test_link_set_collapses_duplicates() {
        let mut links = LinkSet::new();
        assert!(links.insert(EntityKind::Dataset, "d1"));
        assert!(!links.insert(EntityKind::Dataset, "d1"));
        assert_eq!(links.len(), 1);
        assert!(links.contains(EntityKind::Dataset, "d1"));
        assert!(!links.contains(EntityKind::Protocol, "d1"));
    }

    #[test]
    fn test_owner_kind_round_trip() {
        for kind in [OwnerKind::Protocol, OwnerKind::Experiment] {
            assert_eq!(kind.as_str().parse::<OwnerKind>().unwrap(), kind);
        }
        assert!("sample".parse::<OwnerKind>().is_err());
    }

    fn any_kind() -> impl Strategy<Value = EntityKind> {
        prop_oneof![
            Just(EntityKind::Tag),
            Just(EntityKind::Reference),
            Just(EntityKind::Dataset),
            Just(EntityKind::Protocol),
        ]
    }

    proptest! {
        #[test]
        fn prop_anchor_encoding_round_trips(kind in any_kind(), identifier in "[^/]{1,40}") {
            let anchor = Anchor::new(kind, identifier.clone());
            let decoded = Anchor::parse(&anchor.encode()).unwrap();
            prop_assert_eq!(decoded.kind, kind);
            prop_assert_eq!(decoded.identifier, identifier);
        }
    }
}
