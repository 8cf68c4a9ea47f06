//! Anchor extraction
//!
//! Recovers the set of linked entities from document contents. Scanning is
//! a single left-to-right pass over the runs; duplicate anchors collapse
//! into one link.

use crate::document::Document;
use crate::types::{EntityKind, LinkSet};
use tracing::debug;

/// Links carried by the anchor runs of `document`
pub fn scan(document: &Document) -> LinkSet {
    let mut links = LinkSet::new();
    for anchor in document.iterate_runs().filter_map(|run| run.anchor()) {
        links.insert(anchor.kind, anchor.identifier.as_str());
    }
    links
}

/// Links of a whole entry
///
/// The body contributes every kind. The description contributes tags only;
/// other anchors found there are skipped.
pub fn scan_entry(body: &Document, description: &Document) -> LinkSet {
    let mut links = scan(body);
    let from_description = scan(description);

    for kind in EntityKind::ALL {
        if kind == EntityKind::Tag {
            continue;
        }
        let ignored = from_description.get(kind);
        if !ignored.is_empty() {
            debug!(
                "Ignoring {} {} anchor(s) in description",
                ignored.len(),
                kind
            );
        }
    }

    links.extend(EntityKind::Tag, from_description.tags);
    debug!("Scanned {} link(s)", links.len());
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Run;
    use crate::types::Anchor;

    fn tag(name: &str) -> Run {
        Run::anchored(name.replace('_', " "), Anchor::new(EntityKind::Tag, name))
    }

    #[test]
    fn test_scan_collects_each_kind() {
        let document = Document::from_runs([
            Run::plain("Wash with "),
            tag("Acid_Wash"),
            Run::plain(" per "),
            Run::anchored("Smith", Anchor::new(EntityKind::Reference, "R1")),
            Run::plain(" using "),
            Run::anchored("Run 3", Anchor::new(EntityKind::Dataset, "D3")),
        ]);

        let links = scan(&document);
        assert!(links.contains(EntityKind::Tag, "Acid_Wash"));
        assert!(links.contains(EntityKind::Reference, "R1"));
        assert!(links.contains(EntityKind::Dataset, "D3"));
        assert!(links.protocols.is_empty());
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn test_duplicate_anchors_collapse() {
        let document = Document::from_runs([
            tag("pH"),
            Run::plain(" then "),
            tag("pH"),
        ]);
        assert_eq!(scan(&document).tags.len(), 1);
    }

    #[test]
    fn test_plain_document_has_no_links() {
        assert!(scan(&Document::from_text("xyz ")).is_empty());
        assert!(scan(&Document::new()).is_empty());
    }

    #[test]
    fn test_description_contributes_tags_only() {
        let body = Document::from_runs([tag("pH")]);
        let description = Document::from_runs([
            tag("Buffer"),
            Run::plain(" "),
            Run::anchored("Smith", Anchor::new(EntityKind::Reference, "R1")),
        ]);

        let links = scan_entry(&body, &description);
        assert_eq!(
            links.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Buffer", "pH"]
        );
        assert!(links.references.is_empty());
    }
}
