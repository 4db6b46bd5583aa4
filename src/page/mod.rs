//! Storefront page behavior.
//!
//! A [`Page`] owns a [`Document`] and its host [`Window`], and wires the
//! storefront components to them. Events are delivered through its methods:
//! [`Page::dom_content_loaded`], [`Page::window_loaded`], [`Page::click`],
//! [`Page::scroll_to`], and [`Page::advance`] for the passage of time.
//!
//! ```
//! use dicardo::page::{Page, dom::Document, window::Window};
//!
//! let mut doc = Document::new();
//! let timer = doc.append_element(doc.body(), "span", "timer");
//!
//! let mut page = Page::new(doc, Window::default());
//! page.dom_content_loaded();
//! page.advance(3000);
//!
//! assert_eq!(page.document().text(timer), "00:11:56");
//! ```

pub mod countdown;
pub mod dom;
pub mod extras;
pub mod format;
pub mod purchase;
pub mod reveal;
pub mod selection;
pub mod window;

use self::countdown::Countdown;
use self::dom::{Document, NodeId};
use self::extras::AnchorLinks;
use self::purchase::{BuyButtons, ModalAction, PurchaseModal};
use self::reveal::SectionReveal;
use self::selection::{CategoryTabs, ProductCards, WarrantyOptions};
use self::window::{Callback, ScrollBehavior, Window};

/// Result of dispatching a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOutcome {
    /// A listener cancelled the default action.
    pub default_prevented: bool,
    /// Number of listeners that ran.
    pub handled: usize,
}

#[derive(Debug, Clone)]
pub struct Page {
    document: Document,
    window: Window,
    anchors: Option<AnchorLinks>,
    countdown: Option<Countdown>,
    products: Option<ProductCards>,
    warranty: Option<WarrantyOptions>,
    tabs: Option<CategoryTabs>,
    buy: Option<BuyButtons>,
    reveal: Option<SectionReveal>,
    modal: Option<PurchaseModal>,
    ready: bool,
}

impl Page {
    /// Evaluate the page script against a parsed document. Anchor links and
    /// form controls are handled right away, the components wait for
    /// [`Page::dom_content_loaded`].
    pub fn new(mut document: Document, window: Window) -> Self {
        let anchors = AnchorLinks::init(&document);
        extras::apply_rtl_inputs(&mut document);

        Self {
            document,
            window,
            anchors,
            countdown: None,
            products: None,
            warranty: None,
            tabs: None,
            buy: None,
            reveal: None,
            modal: None,
            ready: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    pub fn products(&self) -> Option<&ProductCards> {
        self.products.as_ref()
    }

    pub fn warranty(&self) -> Option<&WarrantyOptions> {
        self.warranty.as_ref()
    }

    pub fn tabs(&self) -> Option<&CategoryTabs> {
        self.tabs.as_ref()
    }

    pub fn reveal(&self) -> Option<&SectionReveal> {
        self.reveal.as_ref()
    }

    pub fn modal(&self) -> Option<&PurchaseModal> {
        self.modal.as_ref()
    }

    /// Initialize every component. Runs once, later calls do nothing.
    pub fn dom_content_loaded(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;

        let doc = &mut self.document;

        self.countdown = Countdown::init(doc, &mut self.window);
        self.products = ProductCards::init(doc);
        self.warranty = WarrantyOptions::init(doc);
        self.tabs = CategoryTabs::init(doc);
        self.buy = BuyButtons::init(doc);
        self.reveal = SectionReveal::init(doc);

        self.evaluate_reveal();
    }

    /// Every resource has loaded.
    pub fn window_loaded(&mut self) {
        extras::mark_loaded(&mut self.document);
    }

    /// Dispatch a click on `target`. Listeners run from the target up through
    /// its ancestors, along the path as it was when the click happened.
    pub fn click(&mut self, target: NodeId) -> ClickOutcome {
        let path: Vec<_> = self.document.ancestors(target).collect();
        let mut outcome = ClickOutcome::default();

        for node in path {
            self.dispatch(node, target, &mut outcome);
        }

        outcome
    }

    fn dispatch(&mut self, node: NodeId, target: NodeId, outcome: &mut ClickOutcome) {
        let doc = &mut self.document;
        let window = &mut self.window;

        if let Some(products) = &self.products
            && products.contains(node)
        {
            products.click(doc, window, node);
            outcome.handled += 1;
        }

        if let Some(warranty) = &self.warranty
            && warranty.contains(node)
        {
            warranty.click(doc, node);
            outcome.handled += 1;
        }

        if let Some(tabs) = &self.tabs
            && tabs.contains(node)
        {
            let category = tabs.click(doc, node);
            tracing::debug!(%category, "category selected");
            outcome.handled += 1;
        }

        if let Some(buy) = &self.buy
            && buy.contains(node)
        {
            outcome.default_prevented = true;
            buy.press(doc, window, node);
            self.open_purchase_modal();
            outcome.handled += 1;
        }

        let action = self
            .modal
            .as_ref()
            .and_then(|modal| modal.on_click(node, target));

        if let Some(action) = action {
            if action == ModalAction::Confirm {
                self.window.alert(purchase::CONFIRMED_ALERT);
            }
            self.close_purchase_modal();
            outcome.handled += 1;
        }

        if let Some(anchors) = &self.anchors
            && anchors.contains(node)
        {
            outcome.default_prevented = true;
            if anchors.click(&self.document, &mut self.window, node).is_some() {
                self.evaluate_reveal();
            }
            outcome.handled += 1;
        }
    }

    /// Show the purchase modal. While one is open, that one is returned.
    pub fn open_purchase_modal(&mut self) -> NodeId {
        match &self.modal {
            Some(modal) => modal.overlay(),
            None => {
                let modal = PurchaseModal::open(&mut self.document);
                let overlay = modal.overlay();
                self.modal = Some(modal);
                overlay
            }
        }
    }

    pub fn close_purchase_modal(&mut self) {
        if let Some(modal) = self.modal.take() {
            modal.remove(&mut self.document);
        }
    }

    /// Scroll the viewport and let the reveal watcher look at it.
    pub fn scroll_to(&mut self, y: f64) {
        self.window.scroll_to(y, ScrollBehavior::Auto);
        self.evaluate_reveal();
    }

    /// Move the clock forward by `ms`, firing every timer that falls due.
    pub fn advance(&mut self, ms: u64) {
        let until = self.window.now() + ms;

        while let Some(callback) = self.window.next_due(until) {
            match callback {
                Callback::CountdownTick => {
                    if let Some(countdown) = &mut self.countdown {
                        countdown.tick(&mut self.document);
                    }
                }
                Callback::ClearTransform(node) => {
                    self.document.set_style(node, "transform", "");
                }
            }
        }

        self.window.set_now(until);
    }

    fn evaluate_reveal(&mut self) {
        if let Some(reveal) = &mut self.reveal {
            let revealed = reveal.evaluate(
                &mut self.document,
                self.window.scroll_y(),
                self.window.inner_height(),
            );
            if !revealed.is_empty() {
                tracing::trace!(count = revealed.len(), "sections revealed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::dom::Rect;
    use super::*;

    /// A storefront with two cards, tabs, sections and a timer.
    struct Shop {
        page: Page,
        timer: NodeId,
        cards: [NodeId; 2],
        warranty: [[NodeId; 2]; 2],
        buy: NodeId,
        tabs: [NodeId; 2],
        sections: [NodeId; 3],
    }

    fn shop() -> Shop {
        let mut doc = Document::new();
        let body = doc.body();

        let header = doc.append_element(body, "header", "");
        let timer = doc.append_element(header, "span", "timer");
        let link = doc.append_element(header, "a", "");
        doc.set_attr(link, "href", "#offers");
        doc.append_element(header, "input", "search");

        let mut tabs = [body; 2];
        for (i, label) in ["همه", " اشتراک "].iter().enumerate() {
            tabs[i] = doc.append_element(body, "button", "tab-button");
            doc.set_text(tabs[i], label);
        }

        let mut cards = [body; 2];
        let mut warranty = [[body; 2]; 2];
        let mut buy = body;
        for i in 0..2 {
            cards[i] = doc.append_element(body, "div", "product-card");
            warranty[i][0] = doc.append_element(cards[i], "button", "warranty-btn active");
            warranty[i][1] = doc.append_element(cards[i], "button", "warranty-btn");
            buy = doc.append_element(cards[i], "a", "buy-button");
        }

        let mut sections = [body; 3];
        for (i, top) in [0.0, 900.0, 1800.0].into_iter().enumerate() {
            sections[i] = doc.append_element(body, "section", "");
            doc.set_rect(sections[i], Rect::new(top, 600.0));
        }
        doc.set_attr(sections[2], "id", "offers");

        Shop {
            page: Page::new(doc, Window::new(800.0)),
            timer,
            cards,
            warranty,
            buy,
            tabs,
            sections,
        }
    }

    fn overlays(page: &Page) -> usize {
        page.document().query_class("purchase-modal").len()
    }

    #[test]
    fn test_countdown_full_cycle() {
        let mut shop = shop();
        shop.page.dom_content_loaded();

        let text = |page: &Page| page.document().text(shop.timer);
        assert_eq!(text(&shop.page), "00:11:59");

        shop.page.advance(1000);
        assert_eq!(text(&shop.page), "00:11:58");

        shop.page.advance(717_000);
        assert_eq!(text(&shop.page), "00:00:01");

        shop.page.advance(1000);
        assert_eq!(text(&shop.page), "00:00:00");

        shop.page.advance(1000);
        assert_eq!(text(&shop.page), "00:11:59");
        assert_eq!(shop.page.countdown().unwrap().seconds(), 719);
    }

    #[test]
    fn test_countdown_display_matches_value() {
        let mut shop = shop();
        shop.page.dom_content_loaded();

        for _ in 0..1500 {
            shop.page.advance(1000);
            let seconds = shop.page.countdown().unwrap().seconds();
            assert_eq!(
                shop.page.document().text(shop.timer),
                countdown::format_clock(seconds)
            );
        }
    }

    #[test]
    fn test_product_selection_follows_last_click() {
        let mut shop = shop();
        shop.page.dom_content_loaded();
        let [a, b] = shop.cards;

        shop.page.click(a);
        shop.page.click(b);

        let selected = shop.page.products().unwrap().group().active(shop.page.document());
        assert_eq!(selected, vec![b]);
        assert_eq!(shop.page.document().style(b, "transform"), Some("scale(1.02)"));

        shop.page.advance(199);
        assert_eq!(shop.page.document().style(b, "transform"), Some("scale(1.02)"));
        shop.page.advance(1);
        assert_eq!(shop.page.document().style(b, "transform"), None);
    }

    #[test]
    fn test_warranty_click_stays_in_its_card() {
        let mut shop = shop();
        shop.page.dom_content_loaded();
        let [[a1, b1], [a2, _]] = shop.warranty;
        let doc = |page: &Page, id| page.document().has_class(id, "active");

        shop.page.click(b1);

        assert!(!doc(&shop.page, a1));
        assert!(doc(&shop.page, b1));
        assert!(doc(&shop.page, a2));

        // the click bubbled to the card around it
        assert!(shop.page.document().has_class(shop.cards[0], "selected"));
    }

    #[test]
    fn test_tabs() {
        let mut shop = shop();
        shop.page.dom_content_loaded();
        let [all, subscriptions] = shop.tabs;

        shop.page.click(subscriptions);
        shop.page.click(all);
        shop.page.click(subscriptions);

        let tabs = shop.page.tabs().unwrap().group().active(shop.page.document());
        assert_eq!(tabs, vec![subscriptions]);
        for card in shop.cards {
            assert_eq!(shop.page.document().style(card, "display"), Some("block"));
        }
    }

    #[test]
    fn test_buy_opens_one_modal() {
        let mut shop = shop();
        shop.page.dom_content_loaded();

        let outcome = shop.page.click(shop.buy);

        assert!(outcome.default_prevented);
        assert_eq!(overlays(&shop.page), 1);
        assert_eq!(shop.page.document().style(shop.buy, "transform"), Some("scale(0.95)"));

        let overlay = shop.page.modal().unwrap().overlay();
        assert_eq!(shop.page.open_purchase_modal(), overlay);
        shop.page.click(shop.buy);
        assert_eq!(overlays(&shop.page), 1);

        shop.page.advance(150);
        assert_eq!(shop.page.document().style(shop.buy, "transform"), None);
    }

    #[test]
    fn test_every_dismissal_removes_the_modal() {
        let dismissals: [fn(&PurchaseModal) -> NodeId; 4] = [
            PurchaseModal::close_button,
            PurchaseModal::cancel_button,
            PurchaseModal::confirm_button,
            PurchaseModal::overlay,
        ];

        for dismiss in dismissals {
            let mut shop = shop();
            shop.page.dom_content_loaded();
            shop.page.click(shop.buy);

            let target = dismiss(shop.page.modal().unwrap());
            shop.page.click(target);

            assert_eq!(overlays(&shop.page), 0);
            assert!(shop.page.modal().is_none());
        }
    }

    #[test]
    fn test_confirm_alerts() {
        let mut shop = shop();
        shop.page.dom_content_loaded();
        shop.page.click(shop.buy);

        let confirm = shop.page.modal().unwrap().confirm_button();
        shop.page.click(confirm);

        assert_eq!(shop.page.window().alerts(), [purchase::CONFIRMED_ALERT]);
    }

    #[test]
    fn test_clicking_modal_content_keeps_it_open() {
        let mut shop = shop();
        shop.page.dom_content_loaded();
        shop.page.click(shop.buy);

        let content = shop.page.document().query_first_class("modal-content").unwrap();
        shop.page.click(content);

        assert_eq!(overlays(&shop.page), 1);
        assert!(shop.page.window().alerts().is_empty());
    }

    #[test]
    fn test_sections_reveal_once_while_scrolling() {
        let mut shop = shop();
        let [hero, middle, offers] = shop.sections;

        shop.page.dom_content_loaded();

        let revealed = |page: &Page, id| page.reveal().unwrap().is_revealed(id);
        assert!(revealed(&shop.page, hero));
        assert!(!revealed(&shop.page, middle));
        assert_eq!(shop.page.document().style(middle, "opacity"), Some("0"));
        assert_eq!(
            shop.page.document().style(middle, "transition"),
            Some("opacity 0.6s ease, transform 0.6s ease")
        );

        shop.page.scroll_to(300.0);
        assert!(revealed(&shop.page, middle));
        assert!(!revealed(&shop.page, offers));

        shop.page.scroll_to(0.0);
        assert_eq!(shop.page.document().style(middle, "opacity"), Some("1"));
    }

    #[test]
    fn test_anchor_scrolls_and_reveals() {
        let mut shop = shop();
        shop.page.dom_content_loaded();

        let link = shop.page.document().query_tags(&["a"])[0];
        let outcome = shop.page.click(link);

        assert!(outcome.default_prevented);
        assert_eq!(shop.page.window().scroll_y(), 1800.0);
        assert!(shop.page.reveal().unwrap().is_revealed(shop.sections[2]));
    }

    #[test]
    fn test_script_evaluation_and_load() {
        let mut shop = shop();
        let input = shop.page.document().query_first_class("search").unwrap();

        assert_eq!(shop.page.document().style(input, "direction"), Some("rtl"));

        shop.page.window_loaded();
        assert!(shop.page.document().has_class(shop.page.document().body(), "loaded"));
    }

    #[test]
    fn test_empty_page_is_inert() {
        let mut page = Page::new(Document::new(), Window::default());
        page.dom_content_loaded();

        let body = page.document().body();
        let outcome = page.click(body);
        page.advance(10_000);
        page.scroll_to(100.0);

        assert_eq!(outcome, ClickOutcome::default());
        assert_eq!(page.window().pending_timers(), 0);
    }

    #[test]
    fn test_ready_runs_once() {
        let mut shop = shop();
        shop.page.dom_content_loaded();
        shop.page.dom_content_loaded();

        assert_eq!(shop.page.window().pending_timers(), 1);
    }
}
