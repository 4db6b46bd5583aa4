//! Host environment of a page: viewport, timers and alerts.
//!
//! Time is virtual. Nothing happens until [`Page::advance`](super::Page::advance)
//! moves the clock forward, which makes timer-driven behavior deterministic.

use super::dom::NodeId;

pub type TimerId = u64;

/// Work scheduled on a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// Advance the countdown by one second.
    CountdownTick,
    /// Drop the inline `transform` of a pulsed element.
    ClearTransform(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    due: u64,
    interval: Option<u64>,
    callback: Callback,
}

#[derive(Debug, Clone)]
pub struct Window {
    now: u64,
    next_id: TimerId,
    timers: Vec<Timer>,
    alerts: Vec<String>,
    scroll_y: f64,
    inner_height: f64,
    scrolls: Vec<(f64, ScrollBehavior)>,
}

impl Default for Window {
    fn default() -> Self {
        Self::new(800.0)
    }
}

impl Window {
    pub fn new(inner_height: f64) -> Self {
        Self {
            now: 0,
            next_id: 1,
            timers: vec![],
            alerts: vec![],
            scroll_y: 0.0,
            inner_height,
            scrolls: vec![],
        }
    }

    /// Milliseconds since the page was created.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn set_interval(&mut self, ms: u64, callback: Callback) -> TimerId {
        self.schedule(ms, Some(ms.max(1)), callback)
    }

    pub fn set_timeout(&mut self, ms: u64, callback: Callback) -> TimerId {
        self.schedule(ms, None, callback)
    }

    fn schedule(&mut self, ms: u64, interval: Option<u64>, callback: Callback) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;

        self.timers.push(Timer {
            id,
            due: self.now + ms,
            interval,
            callback,
        });

        id
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Pop the earliest timer due at or before `until` and move the clock to
    /// it. Timers due at the same time fire in the order they were created.
    pub(crate) fn next_due(&mut self, until: u64) -> Option<Callback> {
        let (index, _) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= until)
            .min_by_key(|(_, timer)| (timer.due, timer.id))?;

        let timer = self.timers.remove(index);
        self.now = timer.due;

        if let Some(interval) = timer.interval {
            self.timers.push(Timer {
                due: timer.due + interval,
                ..timer.clone()
            });
        }

        Some(timer.callback)
    }

    pub(crate) fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    /// Record a blocking message box.
    pub fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn inner_height(&self) -> f64 {
        self.inner_height
    }

    pub fn scroll_to(&mut self, y: f64, behavior: ScrollBehavior) {
        self.scroll_y = y.max(0.0);
        self.scrolls.push((self.scroll_y, behavior));
    }

    /// Every scroll requested so far.
    pub fn scrolls(&self) -> &[(f64, ScrollBehavior)] {
        &self.scrolls
    }
}
