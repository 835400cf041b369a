//! Event bus for prwatch.
//!
//! Keypresses, poll-timer ticks and poll results are normalised into a single
//! `AppEvent` enum and sent over a tokio unbounded MPSC channel. The main
//! loop receives from this channel and is the only place state changes.
//!
//! The timer only *requests* a poll. Whether one starts is up to the
//! scheduler in the main loop, so a slow poll never stacks up behind itself.

use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use prwatch_core::{PollOutcome, WatchError};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// All events the application can receive from any source.
#[derive(Debug)]
#[non_exhaustive]
pub enum AppEvent {
    /// A key press from the terminal (`KeyEventKind::Press` only).
    Key(KeyEvent),
    /// The poll interval elapsed.
    Tick,
    /// Result from the poller task.
    PollFinished(Box<Result<PollOutcome, WatchError>>),
}

/// Holds the sender and receiver ends of the unified event channel.
pub struct EventHandler {
    /// Send half; clone it for each background task that produces events.
    pub tx: mpsc::UnboundedSender<AppEvent>,
    /// Receive half, owned by the main loop.
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the task that turns the poll timer and terminal input into events.
///
/// The first tick of a tokio interval completes immediately; it is consumed
/// up front because the main loop requests the startup poll itself. Missed
/// ticks are delayed rather than bursted. When `interactive` is false no
/// terminal input is read at all.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>, every: Duration, interactive: bool) {
    tokio::spawn(async move {
        let mut poll_interval = interval(every);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll_interval.tick().await;
        let mut reader = interactive.then(EventStream::new);

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if tx.send(AppEvent::Tick).is_err() {
                        break;
                    }
                }
                maybe_event = next_terminal_event(&mut reader) => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            if tx.send(AppEvent::Key(key)).is_err() {
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "terminal input failed, keys disabled");
                            reader = None;
                        }
                        None => reader = None,
                    }
                }
            }
        }
    });
}

/// Next terminal event, or a future that never resolves when input is off.
async fn next_terminal_event(
    reader: &mut Option<EventStream>,
) -> Option<std::io::Result<Event>> {
    match reader {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
