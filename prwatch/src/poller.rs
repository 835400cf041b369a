//! Background task that owns the `Watcher` for its lifetime.
//!
//! All communication is via channels: `PollTrigger` in, `AppEvent::PollFinished`
//! out. Requests are handled strictly one at a time, and the main loop's
//! scheduler only sends a request when no poll is running, so the retained
//! poll state has exactly one writer.

use prwatch_core::scheduler::PollTrigger;
use prwatch_core::{EventSource, Watcher};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::event::AppEvent;

/// Spawns the poller. It runs until the request channel closes or the event
/// channel's receiver is dropped. A poll in progress when the main loop
/// exits is allowed to finish; its result is simply not received.
pub fn spawn_poller<S>(
    mut watcher: Watcher<S>,
    mut requests: UnboundedReceiver<PollTrigger>,
    event_tx: UnboundedSender<AppEvent>,
) where
    S: EventSource + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while let Some(trigger) = requests.recv().await {
            debug!(?trigger, "poll started");
            let result = watcher.poll().await;
            if event_tx
                .send(AppEvent::PollFinished(Box::new(result)))
                .is_err()
            {
                break;
            }
        }
    });
}
