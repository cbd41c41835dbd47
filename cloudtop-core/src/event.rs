//! Event union and terminal event plumbing
//!
//! Everything a screen reacts to arrives as one [`Event`]: a key press, a
//! terminal resize, a periodic tick, or a result message produced by a
//! completed [`Task`](crate::task::Task).

use std::time::Duration;

use crossterm::event::{self, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A single input delivered to a screen's `update`.
///
/// `M` is the screen's result-message type: success/failure payloads of
/// deferred tasks re-enter the loop wrapped in [`Event::Message`].
#[derive(Debug, Clone)]
pub enum Event<M> {
    /// Keyboard event
    Key(KeyEvent),
    /// Terminal resize (width, height)
    Resize(u16, u16),
    /// Periodic tick for spinners and animations
    Tick,
    /// Result of a completed deferred task
    Message(M),
}

impl<M> Event<M> {
    /// Get the key event if this is a key press.
    pub fn key(&self) -> Option<&KeyEvent> {
        match self {
            Event::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Map the message payload into another message type.
    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> Event<N> {
        match self {
            Event::Key(key) => Event::Key(key),
            Event::Resize(w, h) => Event::Resize(w, h),
            Event::Tick => Event::Tick,
            Event::Message(msg) => Event::Message(f(msg)),
        }
    }
}

/// Raw event from crossterm before processing
#[derive(Debug)]
pub enum RawEvent {
    Key(KeyEvent),
    Resize(u16, u16),
}

/// Process a raw event into an `Event`.
///
/// Key releases/repeats are dropped so each physical press is delivered once.
pub fn process_raw_event<M>(raw: RawEvent) -> Option<Event<M>> {
    match raw {
        RawEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        RawEvent::Key(_) => None,
        RawEvent::Resize(w, h) => Some(Event::Resize(w, h)),
    }
}

/// Spawn the crossterm polling task with cancellation support.
///
/// Polls for terminal events off the render path and forwards them through
/// `tx`. The task exits when the token is cancelled or the channel closes.
pub fn spawn_event_poller(
    tx: mpsc::UnboundedSender<RawEvent>,
    poll_timeout: Duration,
    loop_sleep: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        const MAX_EVENTS_PER_BATCH: usize = 20;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("event poller cancelled, draining buffer");
                    while event::poll(Duration::ZERO).unwrap_or(false) {
                        let _ = event::read();
                    }
                    break;
                }
                _ = tokio::time::sleep(loop_sleep) => {
                    let mut events_processed = 0;
                    while events_processed < MAX_EVENTS_PER_BATCH
                        && event::poll(poll_timeout).unwrap_or(false)
                    {
                        events_processed += 1;
                        if let Ok(evt) = event::read() {
                            let raw = match evt {
                                event::Event::Key(key) => Some(RawEvent::Key(key)),
                                event::Event::Resize(w, h) => Some(RawEvent::Resize(w, h)),
                                _ => None,
                            };
                            if let Some(raw) = raw {
                                if tx.send(raw).is_err() {
                                    debug!("event channel closed, stopping poller");
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}
