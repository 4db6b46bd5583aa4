//! In-memory document.
//!
//! Elements live in an arena and are addressed by [`NodeId`]. Removing an
//! element only detaches it, ids stay valid so components can keep holding
//! them. Queries only see elements connected to the body.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Vertical layout box in document coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    rect: Rect,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            classes: vec![],
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            text: String::new(),
            children: vec![],
            parent: None,
            rect: Rect::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("body")],
            body: NodeId(0),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    // Tree

    /// A new detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    /// Create an element and append it to `parent`. `classes` is a space
    /// separated class list.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, classes: &str) -> NodeId {
        let id = self.create_element(tag);
        self.set_class_name(id, classes);
        self.append(parent, id);
        id
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if child == parent || self.contains(child, parent) {
            return;
        }

        self.remove(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Detach `id` and its subtree from its parent.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Whether `node` is `ancestor` or inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|id| id == ancestor)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.body, id)
    }

    /// `id` followed by its parents up to the root of its tree.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&id| self.parent(id))
    }

    /// Every element below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![];
        let mut stack: Vec<_> = self.children(id).iter().rev().copied().collect();

        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }

        out
    }

    // Queries

    pub fn query_class(&self, class: &str) -> Vec<NodeId> {
        self.query_class_in(self.body, class)
    }

    pub fn query_class_in(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.has_class(id, class))
            .collect()
    }

    /// Elements matching any of `tags`, in document order.
    pub fn query_tags(&self, tags: &[&str]) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|&id| tags.contains(&self.tag(id)))
            .collect()
    }

    pub fn query_first_class(&self, class: &str) -> Option<NodeId> {
        self.query_class(class).into_iter().next()
    }

    pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .find(|&id| self.attr(id, "id") == Some(value))
    }

    /// Nearest element carrying `class`, starting at `id` itself.
    pub fn closest(&self, id: NodeId, class: &str) -> Option<NodeId> {
        self.ancestors(id).find(|&id| self.has_class(id, class))
    }

    // Element state

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        &self.node(id).classes
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id).classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            self.node_mut(id).classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        self.node_mut(id).classes.retain(|c| c != class);
    }

    pub fn set_class_name(&mut self, id: NodeId, classes: &str) {
        let node = self.node_mut(id);
        node.classes.clear();
        for class in classes.split_whitespace() {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.node_mut(id)
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.node(id).style.get(property).map(String::as_str)
    }

    /// Set an inline style property. An empty value removes it.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        let style = &mut self.node_mut(id).style;
        if value.is_empty() {
            style.remove(property);
        } else {
            style.insert(property.to_string(), value.to_string());
        }
    }

    /// Replace the inline style with `property: value;` declarations.
    pub fn set_css_text(&mut self, id: NodeId, css: &str) {
        self.node_mut(id).style.clear();

        for declaration in css.split(';') {
            if let Some((property, value)) = declaration.split_once(':') {
                self.set_style(id, property.trim(), value.trim());
            }
        }
    }

    /// Text of the element and all of its descendants.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = self.node(id).text.clone();
        for child in self.descendants(id) {
            out.push_str(&self.node(child).text);
        }
        out
    }

    /// Replace the element's content with `text`.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
        self.node_mut(id).text = text.to_string();
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.node(id).rect
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        self.node_mut(id).rect = rect;
    }
}
