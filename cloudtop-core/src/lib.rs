//! Screen state machine and command-dispatch runtime for cloudtop
//!
//! This crate is the reactive core shared by every screen of the console:
//! a single-threaded, message-driven update loop that turns keyboard and
//! window events into state transitions and issues long-running backend
//! calls as deferred tasks without blocking rendering.
//!
//! # Core Concepts
//!
//! - **Event**: the input union — key press, resize, tick, or a task's
//!   result message
//! - **Command**: a predicate/action pair registered with a [`Dispatcher`];
//!   the first match wins
//! - **Task**: a deferred unit of work whose completion re-enters the event
//!   stream as a message
//! - **FormState / modal**: the focus/validation/submit machinery behind
//!   create-edit forms and confirm dialogs
//! - **Screen**: the `init → update → render` lifecycle contract
//! - **Runtime**: the `tokio::select!` loop delivering events serially
//!
//! # Example
//!
//! ```ignore
//! use cloudtop_core::prelude::*;
//!
//! let mut dispatcher: Dispatcher<MyState, MyMsg> = Dispatcher::new();
//! dispatcher.register(command(
//!     |event, state: &MyState| is_key(event, KeyCode::Char('r')) && !state.loading,
//!     |_, state: &mut MyState| {
//!         state.loading = true;
//!         Outcome::task(Task::new(async { MyMsg::Loaded(fetch().await) }))
//!     },
//! ));
//! ```

pub mod command;
pub mod event;
pub mod form;
pub mod modal;
pub mod runtime;
pub mod screen;
pub mod selection;
pub mod task;
pub mod testing;

pub use command::{command, is_ctrl_key, is_key, Command, Dispatcher, FnCommand, Outcome};
pub use event::{process_raw_event, spawn_event_poller, Event, RawEvent};
pub use form::{Field, FieldError, FormKey, FormMode, FormState};
pub use modal::{centered_rect, render_confirm, route_modal_key, ModalKey};
pub use runtime::{Runtime, RuntimeConfig};
pub use screen::Screen;
pub use selection::Selection;
pub use task::{spawn_task, Task};

// Re-export ratatui types for convenience
pub use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    Frame,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::command::{command, is_ctrl_key, is_key, Command, Dispatcher, Outcome};
    pub use crate::event::Event;
    pub use crate::form::{Field, FieldError, FormKey, FormMode, FormState};
    pub use crate::modal::{centered_rect, render_confirm, route_modal_key, ModalKey};
    pub use crate::runtime::{Runtime, RuntimeConfig};
    pub use crate::screen::Screen;
    pub use crate::selection::Selection;
    pub use crate::task::Task;

    pub use ratatui::{
        layout::Rect,
        style::{Color, Modifier, Style},
        text::{Line, Span, Text},
        Frame,
    };
}
