//! Retained state between polls and the per-poll issue delta.

use std::collections::HashSet;

use crate::merge_queue::QueueState;
use crate::types::{Issue, IssueId};

/// Everything the watcher remembers from one poll to the next.
///
/// Created empty at startup and never persisted. The seen set only grows:
/// an id that disappears (resolved, or missing from a flaky API response)
/// and later comes back is not announced a second time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    seen_ids: HashSet<IssueId>,
    /// A blocking issue or blocking CI failure was present on some poll since
    /// the last ready notification.
    pub last_blocking_issue_present: bool,
    pub last_ready_notified: bool,
    /// `None` until the first poll that could read the queue.
    pub last_queue_state: Option<QueueState>,
    pub polls_completed: u64,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_first_poll(&self) -> bool {
        self.polls_completed == 0
    }

    pub fn seen_ids(&self) -> &HashSet<IssueId> {
        &self.seen_ids
    }

    pub fn has_seen(&self, id: &IssueId) -> bool {
        self.seen_ids.contains(id)
    }

    /// Adds every active id to the seen set. Ids are never removed.
    pub fn record_seen<'a>(&mut self, active: impl IntoIterator<Item = &'a Issue>) {
        self.seen_ids.extend(active.into_iter().map(|i| i.id.clone()));
    }
}

/// Issues present this poll, and the subset not seen before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub new_issues: Vec<Issue>,
    pub active_issues: Vec<Issue>,
}

/// Splits `current` into the active set and the newly appeared subset.
/// Inactive issues are filtered here as well as upstream.
pub fn diff(current: Vec<Issue>, previous_seen: &HashSet<IssueId>) -> Delta {
    let active_issues: Vec<Issue> = current.into_iter().filter(Issue::is_active).collect();
    let new_issues = active_issues
        .iter()
        .filter(|i| !previous_seen.contains(&i.id))
        .cloned()
        .collect();
    Delta {
        new_issues,
        active_issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BotKind, IssueKind};

    fn issue(id: u64) -> Issue {
        Issue {
            id: IssueId::review_comment(id),
            kind: IssueKind::ReviewComment {
                origin: BotKind::Cursorbot,
                location: None,
            },
            body: String::new(),
            url: String::new(),
            created_at: None,
            resolved: false,
            outdated: false,
            blocking: true,
        }
    }

    #[test]
    fn everything_is_new_against_an_empty_set() {
        let delta = diff(vec![issue(1), issue(2)], &HashSet::new());
        assert_eq!(delta.new_issues.len(), 2);
        assert_eq!(delta.active_issues.len(), 2);
    }

    #[test]
    fn seen_ids_are_not_new() {
        let seen: HashSet<_> = [IssueId::review_comment(1)].into_iter().collect();
        let delta = diff(vec![issue(1), issue(2)], &seen);
        assert_eq!(delta.new_issues, vec![issue(2)]);
    }

    #[test]
    fn inactive_issues_never_reach_the_active_set() {
        let mut resolved = issue(3);
        resolved.resolved = true;
        let delta = diff(vec![issue(1), resolved], &HashSet::new());
        assert_eq!(delta.active_issues, vec![issue(1)]);
        assert_eq!(delta.new_issues, vec![issue(1)]);
    }

    #[test]
    fn record_seen_only_grows() {
        let mut state = PollState::new();
        state.record_seen(&[issue(1), issue(2)]);
        state.record_seen(&[issue(3)]);
        assert_eq!(state.seen_ids().len(), 3);
        assert!(state.has_seen(&IssueId::review_comment(1)));
    }
}
