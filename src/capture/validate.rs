//! Pre-capture checks on the target node.

use std::fmt;

use crate::dom::{Document, NodeId};

/// Why a node cannot be captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    NotFound,
    Detached,
    NotVisible,
    NoDimensions,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            InvalidReason::NotFound => "Element not found",
            InvalidReason::Detached => "Element is not in the DOM",
            InvalidReason::NotVisible => "Element is not visible",
            InvalidReason::NoDimensions => "Element has no visible dimensions",
        };
        f.write_str(msg)
    }
}

/// Check that `node` can be captured, returning it unchanged when it can.
///
/// Checks run in order: presence, attachment, visibility, then size. A
/// detached node therefore reports `Detached` rather than `NoDimensions`,
/// and a `display: none` node reports `NotVisible`.
pub fn validate(document: &Document, node: Option<NodeId>) -> Result<NodeId, InvalidReason> {
    let node = match node {
        Some(n) if document.contains(n) => n,
        _ => return Err(InvalidReason::NotFound),
    };

    if !document.is_attached(node) {
        return Err(InvalidReason::Detached);
    }

    if document.is_display_none(node) {
        return Err(InvalidReason::NotVisible);
    }
    let style = document
        .computed_style(node)
        .ok_or(InvalidReason::NotFound)?;
    if style.is_hidden() {
        return Err(InvalidReason::NotVisible);
    }

    match document.bounding_box(node) {
        Some(rect) if !rect.is_empty() => Ok(node),
        _ => Err(InvalidReason::NoDimensions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><style>.ghost { opacity: 0 }</style></head><body>
<div id="ok" style="width: 375px; height: 600px">hello</div>
<div id="empty"></div>
<div id="none" style="display: none">x</div>
<div id="hidden" style="visibility: hidden">x</div>
<div id="ghost" class="ghost">x</div>
<div id="collapsed" style="height: 0">x</div>
<div style="display: none"><p id="nested">x</p></div>
</body></html>"#;

    fn check(id: &str) -> Result<NodeId, InvalidReason> {
        let doc = Document::parse(PAGE);
        let node = doc.element_by_id(id);
        validate(&doc, node)
    }

    #[test]
    fn valid_node_passes() {
        assert!(check("ok").is_ok());
    }

    #[test]
    fn missing_node_is_not_found() {
        assert_eq!(check("nope"), Err(InvalidReason::NotFound));
    }

    #[test]
    fn invisible_nodes_are_rejected() {
        assert_eq!(check("none"), Err(InvalidReason::NotVisible));
        assert_eq!(check("hidden"), Err(InvalidReason::NotVisible));
        assert_eq!(check("ghost"), Err(InvalidReason::NotVisible));
        assert_eq!(check("nested"), Err(InvalidReason::NotVisible));
    }

    #[test]
    fn zero_sized_nodes_have_no_dimensions() {
        assert_eq!(check("empty"), Err(InvalidReason::NoDimensions));
        assert_eq!(check("collapsed"), Err(InvalidReason::NoDimensions));
    }

    #[test]
    fn detached_after_reference() {
        let mut doc = Document::parse(PAGE);
        let node = doc.element_by_id("ok");
        assert!(validate(&doc, node).is_ok());
        doc.detach(node.unwrap());
        assert_eq!(validate(&doc, node), Err(InvalidReason::Detached));
    }
}
