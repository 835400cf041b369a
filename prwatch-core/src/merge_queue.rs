//! Merge-queue state machine.
//!
//! ```text
//!          ┌──────────────────────────────────────────────┐
//!          │   Queued | AwaitingChecks | Mergeable        │
//!  None ──►│   Unmergeable | Locked                       │──► Merged
//!   ▲      └──────────────────────────────────────────────┘
//!   └──────────────── kicked / withdrawn ◄──────┘
//! ```
//!
//! Moves between in-queue states (including position changes) are silent;
//! only entering, leaving, and merging produce a [`QueueTransition`].
//! `Merged` is terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::raw::CiReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueState {
    #[default]
    None,
    Queued,
    AwaitingChecks,
    Mergeable,
    Unmergeable,
    Locked,
    Merged,
}

impl QueueState {
    /// Parses the platform's entry state. Accepts any case and `-` or space
    /// in place of `_`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "QUEUED" => Some(QueueState::Queued),
            "AWAITING_CHECKS" => Some(QueueState::AwaitingChecks),
            "MERGEABLE" => Some(QueueState::Mergeable),
            "UNMERGEABLE" => Some(QueueState::Unmergeable),
            "LOCKED" => Some(QueueState::Locked),
            _ => None,
        }
    }

    pub fn in_queue(self) -> bool {
        !matches!(self, QueueState::None | QueueState::Merged)
    }
}

/// Merge-queue status for one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeQueueStatus {
    pub merged: bool,
    pub in_queue: bool,
    pub state: QueueState,
    /// Entries ahead of this one, when known.
    pub position: Option<u32>,
    /// Raw state string when it did not match any known state.
    pub ambiguous: Option<String>,
}

impl MergeQueueStatus {
    pub fn from_report(report: &CiReport) -> Self {
        if report.merged {
            return Self {
                merged: true,
                state: QueueState::Merged,
                ..Self::default()
            };
        }
        let Some(entry) = &report.merge_queue_entry else {
            return Self::default();
        };
        let position = entry.position.and_then(|p| u32::try_from(p).ok());
        let (state, ambiguous) = match QueueState::parse(&entry.state) {
            Some(state) => (state, None),
            None => (QueueState::Unmergeable, Some(entry.state.clone())),
        };
        Self {
            merged: false,
            in_queue: true,
            state,
            position,
            ambiguous,
        }
    }

    /// Status to use when CI could not be fetched: the previous state is
    /// held so a missing report never looks like a kick from the queue.
    pub fn carried(previous: Option<QueueState>) -> Self {
        let state = previous.unwrap_or_default();
        Self {
            merged: state == QueueState::Merged,
            in_queue: state.in_queue(),
            state,
            position: None,
            ambiguous: None,
        }
    }

    pub fn display(&self) -> QueueDisplay {
        display_state(self.state, self.position)
    }
}

/// Human-facing reading of a queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDisplay {
    NotQueued,
    ReadyAtFront,
    /// At the front but checks have not finished.
    ChecksRunning,
    /// In the queue, but the platform did not say where.
    PositionUnknown,
    Waiting { ahead: u32 },
    /// The platform does not say whether this is a conflict or a failing
    /// check, so neither is claimed.
    UnmergeableCauseUnknown,
    Locked,
    Merged,
}

impl fmt::Display for QueueDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueDisplay::NotQueued => f.write_str("not queued"),
            QueueDisplay::ReadyAtFront => f.write_str("ready, at front of queue"),
            QueueDisplay::ChecksRunning => f.write_str("at front of queue, checks running"),
            QueueDisplay::PositionUnknown => f.write_str("queued, position unknown"),
            QueueDisplay::Waiting { ahead } => write!(f, "waiting, {ahead} ahead"),
            QueueDisplay::UnmergeableCauseUnknown => f.write_str("unmergeable, cause unknown"),
            QueueDisplay::Locked => f.write_str("queue locked"),
            QueueDisplay::Merged => f.write_str("merged"),
        }
    }
}

pub fn display_state(state: QueueState, position: Option<u32>) -> QueueDisplay {
    match (state, position) {
        (QueueState::None, _) => QueueDisplay::NotQueued,
        (QueueState::Merged, _) => QueueDisplay::Merged,
        (QueueState::Locked, _) => QueueDisplay::Locked,
        (QueueState::Mergeable, _) => QueueDisplay::ReadyAtFront,
        (
            QueueState::Queued | QueueState::AwaitingChecks | QueueState::Unmergeable,
            Some(ahead),
        ) if ahead > 0 => QueueDisplay::Waiting { ahead },
        (QueueState::Queued | QueueState::AwaitingChecks, Some(_)) => QueueDisplay::ChecksRunning,
        (QueueState::Queued | QueueState::AwaitingChecks, None) => QueueDisplay::PositionUnknown,
        (QueueState::Unmergeable, _) => QueueDisplay::UnmergeableCauseUnknown,
    }
}

/// An edge in the queue lifecycle worth telling a human about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueTransition {
    Added {
        state: QueueState,
        position: Option<u32>,
    },
    /// Left the queue without merging; the pull request must be re-enqueued.
    Removed { from: QueueState },
    Merged,
}

impl fmt::Display for QueueTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueTransition::Added {
                position: Some(p), ..
            } => write!(f, "added to merge queue at position {p}"),
            QueueTransition::Added { .. } => f.write_str("added to merge queue"),
            QueueTransition::Removed { .. } => {
                f.write_str("removed from merge queue; re-enqueue to merge")
            }
            QueueTransition::Merged => f.write_str("merged"),
        }
    }
}

/// Compares the previous poll's state with the current one. An unknown
/// previous state counts as `None`.
pub fn detect_transition(
    previous: Option<QueueState>,
    current: &MergeQueueStatus,
) -> Option<QueueTransition> {
    let previous = previous.unwrap_or_default();
    if previous == QueueState::Merged {
        return None;
    }
    if current.merged || current.state == QueueState::Merged {
        return Some(QueueTransition::Merged);
    }
    match (previous.in_queue(), current.state.in_queue()) {
        (false, true) => Some(QueueTransition::Added {
            state: current.state,
            position: current.position,
        }),
        (true, false) => Some(QueueTransition::Removed { from: previous }),
        _ => None,
    }
}
