//! Click-to-select groups: product cards, warranty options and category tabs.

use super::dom::{Document, NodeId};
use super::window::{Callback, Window};

/// Elements where at most one carries `class` at a time.
#[derive(Debug, Clone)]
pub struct ExclusiveGroup {
    members: Vec<NodeId>,
    class: &'static str,
}

impl ExclusiveGroup {
    pub fn new(members: Vec<NodeId>, class: &'static str) -> Self {
        Self { members, class }
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.members.contains(&id)
    }

    /// Mark `member` and unmark everyone else.
    pub fn select(&self, doc: &mut Document, member: NodeId) {
        for &other in &self.members {
            doc.remove_class(other, self.class);
        }
        doc.add_class(member, self.class);
    }

    /// Members currently marked.
    pub fn active(&self, doc: &Document) -> Vec<NodeId> {
        self.members
            .iter()
            .copied()
            .filter(|&id| doc.has_class(id, self.class))
            .collect()
    }
}

pub const PULSE_SELECT: &str = "scale(1.02)";
pub const PULSE_SELECT_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct ProductCards {
    group: ExclusiveGroup,
}

impl ProductCards {
    pub fn init(doc: &Document) -> Option<Self> {
        let cards = doc.query_class("product-card");
        if cards.is_empty() {
            return None;
        }

        Some(Self {
            group: ExclusiveGroup::new(cards, "selected"),
        })
    }

    pub fn group(&self) -> &ExclusiveGroup {
        &self.group
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.group.contains(id)
    }

    pub fn click(&self, doc: &mut Document, window: &mut Window, card: NodeId) {
        self.group.select(doc, card);
        doc.set_style(card, "transform", PULSE_SELECT);
        window.set_timeout(PULSE_SELECT_MS, Callback::ClearTransform(card));
    }
}

/// Warranty buttons, grouped by the product card they sit in. Buttons outside
/// of any card form one shared group.
#[derive(Debug, Clone)]
pub struct WarrantyOptions {
    groups: Vec<ExclusiveGroup>,
}

impl WarrantyOptions {
    pub fn init(doc: &Document) -> Option<Self> {
        let buttons = doc.query_class("warranty-btn");
        if buttons.is_empty() {
            return None;
        }

        let mut scopes: Vec<(Option<NodeId>, Vec<NodeId>)> = vec![];
        for button in buttons {
            let card = doc.closest(button, "product-card");
            match scopes.iter_mut().find(|(scope, _)| *scope == card) {
                Some((_, members)) => members.push(button),
                None => scopes.push((card, vec![button])),
            }
        }

        let groups = scopes
            .into_iter()
            .map(|(_, members)| ExclusiveGroup::new(members, "active"))
            .collect();

        Some(Self { groups })
    }

    pub fn groups(&self) -> &[ExclusiveGroup] {
        &self.groups
    }

    pub fn group_of(&self, button: NodeId) -> Option<&ExclusiveGroup> {
        self.groups.iter().find(|group| group.contains(button))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.group_of(id).is_some()
    }

    pub fn click(&self, doc: &mut Document, button: NodeId) {
        if let Some(group) = self.group_of(button) {
            group.select(doc, button);
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryTabs {
    group: ExclusiveGroup,
}

impl CategoryTabs {
    pub fn init(doc: &Document) -> Option<Self> {
        let tabs = doc.query_class("tab-button");
        if tabs.is_empty() {
            return None;
        }

        Some(Self {
            group: ExclusiveGroup::new(tabs, "active"),
        })
    }

    pub fn group(&self) -> &ExclusiveGroup {
        &self.group
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.group.contains(id)
    }

    /// Activate the tab and filter by its label. Returns the category.
    pub fn click(&self, doc: &mut Document, tab: NodeId) -> String {
        self.group.select(doc, tab);

        let category = doc.text(tab).trim().to_string();
        filter_products_by_category(doc, &category);
        category
    }
}

/// Show the products of `category`.
///
/// Products don't carry a category yet, so every card is shown.
pub fn filter_products_by_category(doc: &mut Document, _category: &str) {
    for card in doc.query_class("product-card") {
        doc.set_style(card, "display", "block");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_keeps_one_active() {
        let mut doc = Document::new();
        let body = doc.body();
        let members: Vec<_> = (0..4)
            .map(|_| doc.append_element(body, "button", "tab-button"))
            .collect();
        let group = ExclusiveGroup::new(members.clone(), "active");

        assert!(group.active(&doc).is_empty());

        for i in [2, 0, 0, 3, 1] {
            let clicked = members[i];
            group.select(&mut doc, clicked);
            assert_eq!(group.active(&doc), vec![clicked]);
        }
    }

    #[test]
    fn test_warranty_groups_per_card() {
        let mut doc = Document::new();
        let body = doc.body();
        let card1 = doc.append_element(body, "div", "product-card");
        let a1 = doc.append_element(card1, "button", "warranty-btn active");
        let b1 = doc.append_element(card1, "button", "warranty-btn");
        let card2 = doc.append_element(body, "div", "product-card");
        let a2 = doc.append_element(card2, "button", "warranty-btn active");
        let loose1 = doc.append_element(body, "button", "warranty-btn");
        let loose2 = doc.append_element(body, "button", "warranty-btn");

        let warranty = WarrantyOptions::init(&doc).unwrap();
        assert_eq!(warranty.groups().len(), 3);

        warranty.click(&mut doc, b1);
        assert!(!doc.has_class(a1, "active"));
        assert!(doc.has_class(b1, "active"));
        assert!(doc.has_class(a2, "active"));

        warranty.click(&mut doc, loose1);
        warranty.click(&mut doc, loose2);
        assert!(!doc.has_class(loose1, "active"));
        assert!(doc.has_class(loose2, "active"));
        assert!(doc.has_class(b1, "active"));
    }

    #[test]
    fn test_product_pulse_is_scheduled() {
        let mut doc = Document::new();
        let body = doc.body();
        let card = doc.append_element(body, "div", "product-card");
        let mut window = Window::default();

        let cards = ProductCards::init(&doc).unwrap();
        cards.click(&mut doc, &mut window, card);

        assert!(doc.has_class(card, "selected"));
        assert_eq!(doc.style(card, "transform"), Some(PULSE_SELECT));
        assert_eq!(
            window.next_due(PULSE_SELECT_MS),
            Some(Callback::ClearTransform(card))
        );
    }

    #[test]
    fn test_tab_filter_shows_every_card() {
        let mut doc = Document::new();
        let body = doc.body();
        let card = doc.append_element(body, "div", "product-card");
        doc.set_style(card, "display", "none");
        let tab = doc.append_element(body, "button", "tab-button");
        doc.set_text(tab, "  اکانت‌های بازی \n");

        let tabs = CategoryTabs::init(&doc).unwrap();
        let category = tabs.click(&mut doc, tab);

        assert_eq!(category, "اکانت‌های بازی");
        assert_eq!(doc.style(card, "display"), Some("block"));
    }

    #[test]
    fn test_init_without_elements() {
        let doc = Document::new();

        assert!(ProductCards::init(&doc).is_none());
        assert!(WarrantyOptions::init(&doc).is_none());
        assert!(CategoryTabs::init(&doc).is_none());
    }
}
