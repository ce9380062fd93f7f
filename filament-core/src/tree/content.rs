//! Replace-Subtree Helpers
//!
//! Small, synchronous helpers that swap an element's entire content for a new
//! node. No concurrency, no lifecycle: these are the mechanical counterpart of
//! the reactive driver for hosts that already know the node they want shown.

use crate::error::Error;
use crate::reactive::{render, Value};
use super::document::Document;
use super::node::NodeId;

/// Replace `element`'s content with `node`.
///
/// Trailing children are popped until the last child is `node`; if `node` is
/// not already the last child it is appended. Passing `None` leaves the
/// element untouched.
pub fn replace_content(
    doc: &Document,
    element: NodeId,
    node: Option<NodeId>,
) -> Result<(), Error> {
    let Some(node) = node else {
        return Ok(());
    };
    loop {
        match doc.children(element).last().copied() {
            Some(last) if last == node => return Ok(()),
            Some(last) => doc.detach(last)?,
            None => break,
        }
    }
    doc.append_child(element, node)
}

/// Render `value` and replace `element`'s content with the result.
///
/// A value that renders to nothing leaves the element untouched. Returns the
/// rendered node, if any.
pub fn render_into(
    doc: &Document,
    element: NodeId,
    value: &Value,
) -> Result<Option<NodeId>, Error> {
    let node = render(doc, value);
    replace_content(doc, element, node)?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_content_clears_and_appends() {
        let doc = Document::new();
        let element = doc.create_element("div");
        let old1 = doc.create_text("old1");
        let old2 = doc.create_text("old2");
        doc.append_child(element, old1).unwrap();
        doc.append_child(element, old2).unwrap();

        let new = doc.create_text("new");
        replace_content(&doc, element, Some(new)).unwrap();

        assert_eq!(doc.children(element), vec![new]);
        assert_eq!(doc.text_content(element), "new");
    }

    #[test]
    fn replace_content_keeps_existing_last_child() {
        let doc = Document::new();
        let element = doc.create_element("div");
        let keep = doc.create_text("keep");
        doc.append_child(element, keep).unwrap();

        replace_content(&doc, element, Some(keep)).unwrap();
        assert_eq!(doc.children(element), vec![keep]);
    }

    #[test]
    fn replace_content_trims_trailing_siblings_only() {
        let doc = Document::new();
        let element = doc.create_element("div");
        let first = doc.create_text("first");
        let target = doc.create_text("target");
        let trailing = doc.create_text("trailing");
        doc.append_child(element, first).unwrap();
        doc.append_child(element, target).unwrap();
        doc.append_child(element, trailing).unwrap();

        replace_content(&doc, element, Some(target)).unwrap();
        assert_eq!(doc.children(element), vec![first, target]);
    }

    #[test]
    fn replace_content_with_none_is_a_no_op() {
        let doc = Document::new();
        let element = doc.create_element("div");
        let child = doc.create_text("kept");
        doc.append_child(element, child).unwrap();

        replace_content(&doc, element, None).unwrap();
        assert_eq!(doc.children(element), vec![child]);
    }

    #[test]
    fn render_into_renders_then_replaces() {
        let doc = Document::new();
        let element = doc.create_element("div");
        let old = doc.create_text("old");
        doc.append_child(element, old).unwrap();

        let rendered = render_into(&doc, element, &Value::Text("fresh".into())).unwrap();
        assert!(rendered.is_some());
        assert_eq!(doc.text_content(element), "fresh");
    }

    #[test]
    fn render_into_missing_leaves_content() {
        let doc = Document::new();
        let element = doc.create_element("div");
        let old = doc.create_text("old");
        doc.append_child(element, old).unwrap();

        let rendered = render_into(&doc, element, &Value::Missing).unwrap();
        assert!(rendered.is_none());
        assert_eq!(doc.text_content(element), "old");
    }
}
