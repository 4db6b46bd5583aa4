//! Buy buttons and the purchase confirmation modal.

use super::dom::{Document, NodeId};
use super::window::{Callback, Window};

pub const TITLE: &str = "خرید محصول";
pub const CLOSE_LABEL: &str = "×";
pub const MESSAGE: &str = "آیا مطمئن هستید که می‌خواهید این محصول را خریداری کنید؟";
pub const CONFIRM_LABEL: &str = "تأیید خرید";
pub const CANCEL_LABEL: &str = "انصراف";
pub const CONFIRMED_ALERT: &str = "خرید با موفقیت انجام شد!";

pub const PULSE_PRESS: &str = "scale(0.95)";
pub const PULSE_PRESS_MS: u64 = 150;

const OVERLAY_STYLE: &str = "
    position: fixed;
    top: 0;
    left: 0;
    width: 100%;
    height: 100%;
    background: rgba(0, 0, 0, 0.5);
    display: flex;
    align-items: center;
    justify-content: center;
    z-index: 1000;
";

const CONTENT_STYLE: &str = "
    background: white;
    padding: 2rem;
    border-radius: 15px;
    max-width: 400px;
    width: 90%;
    text-align: center;
";

/// `.buy-button` and `.buy-now-button` elements.
#[derive(Debug, Clone)]
pub struct BuyButtons {
    buttons: Vec<NodeId>,
}

impl BuyButtons {
    pub fn init(doc: &Document) -> Option<Self> {
        let buttons: Vec<_> = doc
            .descendants(doc.body())
            .into_iter()
            .filter(|&id| doc.has_class(id, "buy-button") || doc.has_class(id, "buy-now-button"))
            .collect();

        if buttons.is_empty() {
            return None;
        }

        Some(Self { buttons })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.buttons.contains(&id)
    }

    /// Press feedback. Opening the modal is up to the caller.
    pub fn press(&self, doc: &mut Document, window: &mut Window, button: NodeId) {
        doc.set_style(button, "transform", PULSE_PRESS);
        window.set_timeout(PULSE_PRESS_MS, Callback::ClearTransform(button));
    }
}

/// What a click inside the modal asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    Close,
    Confirm,
}

/// The confirmation overlay and its controls.
#[derive(Debug, Clone)]
pub struct PurchaseModal {
    overlay: NodeId,
    close: NodeId,
    confirm: NodeId,
    cancel: NodeId,
}

impl PurchaseModal {
    /// Build the overlay and append it to the body.
    pub fn open(doc: &mut Document) -> Self {
        let overlay = doc.create_element("div");
        doc.set_class_name(overlay, "purchase-modal");
        doc.set_css_text(overlay, OVERLAY_STYLE);

        let content = doc.append_element(overlay, "div", "modal-content");
        doc.set_css_text(content, CONTENT_STYLE);

        let header = doc.append_element(content, "div", "modal-header");
        let title = doc.append_element(header, "h3", "");
        doc.set_text(title, TITLE);
        let close = doc.append_element(header, "button", "close-modal");
        doc.set_text(close, CLOSE_LABEL);

        let body = doc.append_element(content, "div", "modal-body");
        let message = doc.append_element(body, "p", "");
        doc.set_text(message, MESSAGE);

        let actions = doc.append_element(body, "div", "modal-actions");
        let confirm = doc.append_element(actions, "button", "btn-confirm");
        doc.set_text(confirm, CONFIRM_LABEL);
        let cancel = doc.append_element(actions, "button", "btn-cancel");
        doc.set_text(cancel, CANCEL_LABEL);

        let root = doc.body();
        doc.append(root, overlay);

        Self {
            overlay,
            close,
            confirm,
            cancel,
        }
    }

    pub fn overlay(&self) -> NodeId {
        self.overlay
    }

    pub fn close_button(&self) -> NodeId {
        self.close
    }

    pub fn confirm_button(&self) -> NodeId {
        self.confirm
    }

    pub fn cancel_button(&self) -> NodeId {
        self.cancel
    }

    /// Listener of `node` for a click on `target`. Clicks that land on the
    /// content never reach the backdrop handler as its own target.
    pub fn on_click(&self, node: NodeId, target: NodeId) -> Option<ModalAction> {
        if node == self.close || node == self.cancel {
            Some(ModalAction::Close)
        } else if node == self.confirm {
            Some(ModalAction::Confirm)
        } else if node == self.overlay && target == self.overlay {
            Some(ModalAction::Close)
        } else {
            None
        }
    }

    pub fn remove(&self, doc: &mut Document) {
        doc.remove(self.overlay);
    }
}
