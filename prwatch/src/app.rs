//! Central application state for prwatch.
//!
//! Owns the poll scheduler and the most recent snapshot. Everything here is
//! mutated only by the main event loop; the poller task owns the watcher's
//! retained state separately and reports back through events.

use prwatch_core::merge_queue::QueueState;
use prwatch_core::scheduler::{Admission, PollScheduler, PollTrigger};
use prwatch_core::{Issue, PollSnapshot};

pub struct AppState {
    scheduler: PollScheduler,
    /// The last snapshot the reporter printed.
    pub last: Option<PollSnapshot>,
    exit_on_merge: bool,
}

impl AppState {
    pub fn new(exit_on_merge: bool) -> Self {
        Self {
            scheduler: PollScheduler::new(),
            last: None,
            exit_on_merge,
        }
    }

    /// Asks the scheduler for a poll. The caller sends a request to the
    /// poller only on `Admission::Start`.
    pub fn request_poll(&mut self, trigger: PollTrigger) -> Admission {
        self.scheduler.request(trigger)
    }

    /// Stores a finished poll's snapshot. Returns `true` when a deferred
    /// refresh should be sent to the poller right away.
    pub fn finish_poll(&mut self, snapshot: PollSnapshot) -> bool {
        self.last = Some(snapshot);
        self.scheduler.complete()
    }

    /// True once the pull request has merged and the watch should end.
    pub fn should_exit(&self) -> bool {
        self.exit_on_merge
            && self
                .last
                .as_ref()
                .is_some_and(|s| s.merge_queue.state == QueueState::Merged)
    }

    /// The active issue at `index` in the last snapshot.
    pub fn issue_at(&self, index: usize) -> Option<&Issue> {
        let snapshot = self.last.as_ref()?;
        let id = &snapshot.active_issues.get(index)?.id;
        snapshot.issue(id)
    }
}
