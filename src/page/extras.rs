//! Page-wide touches that aren't tied to a storefront component.

use super::dom::{Document, NodeId};
use super::window::{ScrollBehavior, Window};

/// In-page links, `a[href^="#"]`.
#[derive(Debug, Clone)]
pub struct AnchorLinks {
    anchors: Vec<(NodeId, String)>,
}

impl AnchorLinks {
    pub fn init(doc: &Document) -> Option<Self> {
        let anchors: Vec<_> = doc
            .query_tags(&["a"])
            .into_iter()
            .filter_map(|id| {
                let href = doc.attr(id, "href")?;
                href.starts_with('#').then(|| (id, href.to_string()))
            })
            .collect();

        if anchors.is_empty() {
            return None;
        }

        Some(Self { anchors })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.anchors.iter().any(|(anchor, _)| *anchor == id)
    }

    /// Smooth-scroll to the link target. Returns the target, if there is one.
    pub fn click(&self, doc: &Document, window: &mut Window, anchor: NodeId) -> Option<NodeId> {
        let (_, href) = self.anchors.iter().find(|(id, _)| *id == anchor)?;

        let id = href.strip_prefix('#').filter(|id| !id.is_empty())?;
        let target = doc.get_element_by_id(id)?;

        window.scroll_to(doc.rect(target).top, ScrollBehavior::Smooth);
        Some(target)
    }
}

/// Force right-to-left text in every form control present right now.
pub fn apply_rtl_inputs(doc: &mut Document) -> usize {
    let inputs = doc.query_tags(&["input", "textarea", "select"]);

    for &input in &inputs {
        doc.set_style(input, "direction", "rtl");
        doc.set_style(input, "text-align", "right");
    }

    inputs.len()
}

pub fn mark_loaded(doc: &mut Document) {
    let body = doc.body();
    doc.add_class(body, "loaded");
}
