//! Screen lifecycle contract
//!
//! Every top-level view implements the same three-phase contract:
//! `init` (kick off the first fetch), `update` (the only mutation point),
//! `render` (a pure function of state, safe to call repeatedly).

use ratatui::{layout::Rect, Frame};

use crate::command::Outcome;
use crate::event::Event;

/// One independent top-level view.
///
/// State is created at activation (loading, empty collection), mutated
/// exclusively by `update`, and discarded when the screen is replaced.
pub trait Screen {
    /// Result-message type produced by this screen's deferred tasks.
    type Msg: Send + 'static;

    /// Called once when the screen becomes active.
    fn init(&mut self) -> Outcome<Self::Msg>;

    /// Apply one event. Must be a total function of (state, event); it may
    /// never assume anything about task completion order.
    fn update(&mut self, event: Event<Self::Msg>) -> Outcome<Self::Msg>;

    /// Draw the current state. No side effects.
    fn render(&self, frame: &mut Frame, area: Rect);
}
