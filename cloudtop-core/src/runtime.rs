//! Event loop runtime
//!
//! Single-threaded cooperative scheduling: one event at a time flows through
//! the active screen's `update`, any returned task is spawned off the render
//! path, and the screen is redrawn between fully-completed updates. Task
//! results are serialized back into the event stream, so all state mutation
//! stays on this loop.

use std::io;
use std::time::Duration;

use ratatui::{backend::Backend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::event::{process_raw_event, spawn_event_poller, Event, RawEvent};
use crate::screen::Screen;
use crate::task::spawn_task;

/// Configuration for the event poller and tick timer.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Timeout passed to each `crossterm::event::poll` call.
    pub poll_timeout: Duration,
    /// Sleep between poll cycles.
    pub loop_sleep: Duration,
    /// Interval between `Event::Tick` deliveries.
    pub tick_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(10),
            loop_sleep: Duration::from_millis(16),
            tick_interval: Duration::from_millis(250),
        }
    }
}

/// Drives a [`Screen`] until its update returns a quit outcome.
pub struct Runtime<S: Screen> {
    screen: S,
    msg_tx: mpsc::UnboundedSender<S::Msg>,
    msg_rx: mpsc::UnboundedReceiver<S::Msg>,
    config: RuntimeConfig,
}

impl<S: Screen> Runtime<S> {
    /// Create a runtime around a screen.
    pub fn new(screen: S) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        Self {
            screen,
            msg_tx,
            msg_rx,
            config: RuntimeConfig::default(),
        }
    }

    /// Override the poller/tick configuration.
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Access the screen (used by tests to inspect final state).
    pub fn screen(&self) -> &S {
        &self.screen
    }

    /// Run the event loop until a command quits.
    ///
    /// Exactly one event is processed per iteration; `render` is only
    /// invoked between fully-completed `update` calls.
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RawEvent>();
        let cancel_token = CancellationToken::new();
        let _poller = spawn_event_poller(
            event_tx,
            self.config.poll_timeout,
            self.config.loop_sleep,
            cancel_token.clone(),
        );
        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let outcome = self.screen.init();
        if let Some(task) = outcome.task {
            spawn_task(self.msg_tx.clone(), task);
        }
        terminal.draw(|frame| self.screen.render(frame, frame.area()))?;

        loop {
            let event: Event<S::Msg> = tokio::select! {
                Some(raw) = event_rx.recv() => {
                    match process_raw_event(raw) {
                        Some(event) => event,
                        None => continue,
                    }
                }
                Some(msg) = self.msg_rx.recv() => Event::Message(msg),
                _ = tick.tick() => Event::Tick,
                else => break,
            };

            let outcome = self.screen.update(event);
            if let Some(task) = outcome.task {
                spawn_task(self.msg_tx.clone(), task);
            }
            if outcome.quit {
                debug!("quit requested, leaving event loop");
                break;
            }

            terminal.draw(|frame| self.screen.render(frame, frame.area()))?;
        }

        cancel_token.cancel();
        Ok(())
    }
}
