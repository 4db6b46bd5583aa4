use super::dom::{Document, NodeId};
use super::window::{Callback, Window};

/// Value the countdown starts from and returns to, `00:11:59`.
pub const RESET_SECONDS: u32 = 11 * 60 + 59;

pub const TICK_MS: u64 = 1000;

/// The offer countdown in `.timer`.
///
/// Each tick first steps the value, down by one or from zero back to
/// [`RESET_SECONDS`], then renders it. `00:00:00` is therefore on screen for
/// exactly one tick.
#[derive(Debug, Clone)]
pub struct Countdown {
    element: NodeId,
    seconds: u32,
}

impl Countdown {
    /// Render the start value and schedule the ticks. `None` without a
    /// `.timer` element.
    pub fn init(doc: &mut Document, window: &mut Window) -> Option<Self> {
        let element = doc.query_first_class("timer")?;

        let countdown = Self {
            element,
            seconds: RESET_SECONDS,
        };
        countdown.render(doc);
        window.set_interval(TICK_MS, Callback::CountdownTick);

        Some(countdown)
    }

    pub fn tick(&mut self, doc: &mut Document) {
        self.seconds = match self.seconds {
            0 => RESET_SECONDS,
            s => s - 1,
        };
        self.render(doc);
    }

    /// Seconds currently on display.
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    fn render(&self, doc: &mut Document) {
        doc.set_text(self.element, &format_clock(self.seconds));
    }
}

/// `HH:MM:SS`, every field zero-padded to two digits.
pub fn format_clock(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
