//! Command pattern with first-match-wins dispatch
//!
//! A [`Command`] is a predicate/action pair: "can this handle the current
//! event?" and "produce the next state plus an optional deferred task". The
//! [`Dispatcher`] holds an ordered list of commands; the first one whose
//! predicate matches wins and later registrations are never consulted.
//!
//! Registration order is a correctness contract: global keys (quit, resize)
//! go first so they cannot be shadowed, modal/form capture next, and the
//! catch-all "pass keystroke to the focused sub-widget" command last so
//! specific bindings take precedence.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::event::Event;
use crate::task::Task;

/// Result of running a command or an `update` call.
///
/// Carries the optional deferred task the event loop must schedule, plus the
/// quit flag raised only by the dedicated quit command.
pub struct Outcome<M> {
    /// Deferred work to execute off the render path.
    pub task: Option<Task<M>>,
    /// Whether the event loop should terminate.
    pub quit: bool,
}

impl<M> Outcome<M> {
    /// No task, keep running.
    pub fn none() -> Self {
        Self {
            task: None,
            quit: false,
        }
    }

    /// Schedule one deferred task.
    pub fn task(task: Task<M>) -> Self {
        Self {
            task: Some(task),
            quit: false,
        }
    }

    /// Terminate the event loop.
    pub fn quit() -> Self {
        Self {
            task: None,
            quit: true,
        }
    }

    /// Lift the outcome's task into another message type.
    pub fn map<N, F>(self, f: F) -> Outcome<N>
    where
        M: Send + 'static,
        N: Send + 'static,
        F: FnOnce(M) -> N + Send + 'static,
    {
        Outcome {
            task: self.task.map(|t| t.map(f)),
            quit: self.quit,
        }
    }
}

impl<M> Default for Outcome<M> {
    fn default() -> Self {
        Self::none()
    }
}

impl<M> std::fmt::Debug for Outcome<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outcome")
            .field("has_task", &self.task.is_some())
            .field("quit", &self.quit)
            .finish()
    }
}

/// A predicate-guarded state transition.
///
/// Commands are stateless and registered once at screen construction. An
/// action must not panic for well-formed state: structural preconditions
/// ("selection in range", "not already loading") are checked in `matches` or
/// at the top of `run`, degrading to a no-op when unmet.
pub trait Command<S, M> {
    /// Whether this command handles the event in the current state.
    fn matches(&self, event: &Event<M>, state: &S) -> bool;

    /// Apply the transition, returning an optional deferred task.
    fn run(&self, event: &Event<M>, state: &mut S) -> Outcome<M>;
}

/// Command built from a pair of closures.
pub struct FnCommand<P, R> {
    predicate: P,
    action: R,
}

impl<S, M, P, R> Command<S, M> for FnCommand<P, R>
where
    P: Fn(&Event<M>, &S) -> bool,
    R: Fn(&Event<M>, &mut S) -> Outcome<M>,
{
    fn matches(&self, event: &Event<M>, state: &S) -> bool {
        (self.predicate)(event, state)
    }

    fn run(&self, event: &Event<M>, state: &mut S) -> Outcome<M> {
        (self.action)(event, state)
    }
}

/// Build a command from predicate and action closures.
pub fn command<S, M, P, R>(predicate: P, action: R) -> FnCommand<P, R>
where
    P: Fn(&Event<M>, &S) -> bool,
    R: Fn(&Event<M>, &mut S) -> Outcome<M>,
{
    FnCommand { predicate, action }
}

/// Whether a key event is a plain press of `code` (no modifiers).
pub fn is_key<M>(event: &Event<M>, code: KeyCode) -> bool {
    matches!(event.key(), Some(key) if key.code == code && key.modifiers == KeyModifiers::NONE)
}

/// Whether a key event is `code` pressed with Ctrl held.
pub fn is_ctrl_key<M>(event: &Event<M>, code: KeyCode) -> bool {
    matches!(
        event.key(),
        Some(key) if key.code == code && key.modifiers.contains(KeyModifiers::CONTROL)
    )
}

/// Ordered list of commands with first-match-wins dispatch.
///
/// The dispatcher never blocks or performs I/O; any side effect leaves as a
/// [`Task`] for the event loop to schedule.
pub struct Dispatcher<S, M> {
    commands: Vec<Box<dyn Command<S, M> + Send>>,
}

impl<S, M> Dispatcher<S, M> {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Register a command. Earlier registrations take precedence.
    pub fn register<C>(&mut self, command: C) -> &mut Self
    where
        C: Command<S, M> + Send + 'static,
    {
        self.commands.push(Box::new(command));
        self
    }

    /// Dispatch an event against the registered commands.
    ///
    /// The first command whose predicate returns true wins; later matches are
    /// never evaluated. If nothing matches the state is returned unchanged
    /// and no task is produced.
    pub fn dispatch(&self, event: &Event<M>, state: &mut S) -> Outcome<M> {
        for command in &self.commands {
            if command.matches(event, state) {
                return command.run(event, state);
            }
        }
        Outcome::none()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<S, M> Default for Dispatcher<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for key predicates against a [`KeyEvent`].
pub fn key_pressed(key: &KeyEvent, code: KeyCode) -> bool {
    key.code == code && key.modifiers == KeyModifiers::NONE
}
