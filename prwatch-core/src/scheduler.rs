//! In-flight guard for the poll loop.
//!
//! Polls never overlap. A timer tick that lands while a poll is running is
//! dropped, because the next tick will come anyway. A manual refresh is
//! coalesced: any number of refreshes during one poll collapse into a single
//! follow-up poll that starts as soon as the running one completes.

/// Why a poll was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    Startup,
    Timer,
    Manual,
}

/// The scheduler's answer to a poll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No poll was running; start one now.
    Start,
    /// A poll is running; one more will start when it completes.
    Deferred,
    /// A poll is running and the request is not worth repeating.
    Skipped,
}

#[derive(Debug, Default)]
pub struct PollScheduler {
    in_flight: bool,
    follow_up: bool,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn request(&mut self, trigger: PollTrigger) -> Admission {
        if !self.in_flight {
            self.in_flight = true;
            return Admission::Start;
        }
        match trigger {
            PollTrigger::Manual => {
                self.follow_up = true;
                Admission::Deferred
            }
            PollTrigger::Startup | PollTrigger::Timer => Admission::Skipped,
        }
    }

    /// Marks the running poll finished. Returns `true` when a deferred
    /// request should start immediately; the scheduler is then in flight
    /// again.
    pub fn complete(&mut self) -> bool {
        self.in_flight = std::mem::take(&mut self.follow_up);
        self.in_flight
    }
}
