//! Edge-triggered notification rules.
//!
//! Three rules run on every poll against the retained [`PollState`]:
//!
//! 1. **New blocking issues**: fires with exactly the new blocking issues,
//!    except on the first poll, and re-arms the ready rule.
//! 2. **Ready to merge**: fires once when nothing blocks, CI is green, and
//!    something was blocking on an earlier poll. A pull request that was
//!    always clean never fires. Needs a complete poll: a category that could
//!    not be fetched is "unknown", not "clear".
//! 3. **Queue transition**: entering, leaving, or merging.
//!
//! Notifications come out highest priority first: queue transition, ready,
//! new issues.

use crate::ci::CiAggregate;
use crate::merge_queue::{detect_transition, MergeQueueStatus, QueueTransition};
use crate::tracker::{Delta, PollState};
use crate::types::Issue;

/// Something worth interrupting a human for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    NewIssues(Vec<Issue>),
    ReadyToMerge,
    QueueTransition(QueueTransition),
}

/// What the policy looks at for one poll.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    pub delta: &'a Delta,
    pub ci: &'a CiAggregate,
    pub queue: &'a MergeQueueStatus,
    pub is_first_poll: bool,
    /// Every category was fetched this poll.
    pub complete: bool,
}

/// Applies the three rules, updating the notification flags and the
/// remembered queue state in `state`. Does not touch the seen set.
pub fn evaluate(state: &mut PollState, input: PolicyInput<'_>) -> Vec<Notification> {
    let mut out = Vec::new();

    if let Some(transition) = detect_transition(state.last_queue_state, input.queue) {
        out.push(Notification::QueueTransition(transition));
    }
    state.last_queue_state = Some(input.queue.state);

    let new_blocking: Vec<Issue> = input
        .delta
        .new_issues
        .iter()
        .filter(|i| i.blocking)
        .cloned()
        .collect();
    let announce_new = !new_blocking.is_empty() && !input.is_first_poll;
    if announce_new {
        state.last_ready_notified = false;
    }

    let blocking_active = input.delta.active_issues.iter().any(|i| i.blocking);
    let ready = input.complete
        && !input.queue.merged
        && !blocking_active
        && input.ci.all_green
        && !state.last_ready_notified
        && state.last_blocking_issue_present;
    if ready {
        out.push(Notification::ReadyToMerge);
        state.last_ready_notified = true;
        state.last_blocking_issue_present = false;
    }
    if blocking_active || input.ci.failed_blocking > 0 {
        state.last_blocking_issue_present = true;
    }

    if announce_new {
        out.push(Notification::NewIssues(new_blocking));
    }
    out
}
