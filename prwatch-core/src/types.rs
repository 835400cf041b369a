//! Canonical issue records shared by every stage of a poll.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity of an issue across polls.
///
/// Each constructor prefixes the platform id with its origin category, so a
/// review comment and a general comment that happen to share a numeric id
/// can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(String);

impl IssueId {
    /// Identity of an inline review comment. Keyed on the comment id, never
    /// the thread id, since one thread can collect several bot comments.
    pub fn review_comment(comment_id: u64) -> Self {
        IssueId(format!("review:{comment_id}"))
    }

    /// Identity of a top-level conversation comment.
    pub fn general_comment(comment_id: u64) -> Self {
        IssueId(format!("comment:{comment_id}"))
    }

    /// Identity of a check run carrying a platform id.
    pub fn check_run(check_id: u64) -> Self {
        IssueId(format!("check:{check_id}"))
    }

    /// Identity of a check run that arrived without an id. Kept under its
    /// own prefix so a check named "10" never collides with check id 10.
    pub fn check_run_named(name: &str) -> Self {
        IssueId(format!("check-name:{}", name.trim().to_lowercase()))
    }

    /// Identity of a legacy commit status. Every status the platform records
    /// gets a fresh id, so a context that fails again on a later push is a
    /// new issue.
    pub fn commit_status(status_id: u64) -> Self {
        IssueId(format!("status:{status_id}"))
    }

    /// Identity of a commit status that arrived without an id.
    pub fn commit_status_named(context: &str) -> Self {
        IssueId(format!("status-context:{}", context.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IssueId {
    fn from(s: &str) -> Self {
        IssueId(s.to_owned())
    }
}

impl From<String> for IssueId {
    fn from(s: String) -> Self {
        IssueId(s)
    }
}

/// Which review bot authored a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotKind {
    Cursorbot,
    Codex,
    /// Any other roster entry, including caller-supplied names.
    Other,
}

impl fmt::Display for BotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotKind::Cursorbot => f.write_str("cursor"),
            BotKind::Codex => f.write_str("codex"),
            BotKind::Other => f.write_str("bot"),
        }
    }
}

/// File position a review comment is anchored to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub line: Option<u32>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path, line),
            None => f.write_str(&self.path),
        }
    }
}

/// Which CI API reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CiSource {
    CheckRun,
    CommitStatus,
}

/// The variant-specific part of an [`Issue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// A bot comment attached to a review thread.
    ReviewComment {
        origin: BotKind,
        location: Option<Location>,
    },
    /// A bot comment on the pull request conversation.
    GeneralComment { origin: BotKind },
    /// A failing check run or commit status.
    CiFailure { name: String, source: CiSource },
}

impl IssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::ReviewComment { .. } => "review",
            IssueKind::GeneralComment { .. } => "comment",
            IssueKind::CiFailure { .. } => "ci",
        }
    }
}

/// A normalized unit of actionable feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub kind: IssueKind,
    pub body: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub outdated: bool,
    /// Computed by the classifier; comment kinds are always blocking.
    pub blocking: bool,
}

impl Issue {
    /// An issue is active unless its thread was resolved or its code moved on.
    pub fn is_active(&self) -> bool {
        !self.resolved && !self.outdated
    }

    pub fn origin(&self) -> Option<BotKind> {
        match &self.kind {
            IssueKind::ReviewComment { origin, .. } | IssueKind::GeneralComment { origin } => {
                Some(*origin)
            }
            IssueKind::CiFailure { .. } => None,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match &self.kind {
            IssueKind::ReviewComment { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    /// First non-empty line of the body, clipped to `max` characters.
    pub fn summary(&self, max: usize) -> String {
        let line = self
            .body
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("");
        if line.chars().count() <= max {
            line.to_owned()
        } else {
            let clipped: String = line.chars().take(max.saturating_sub(1)).collect();
            format!("{clipped}…")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(body: &str) -> Issue {
        Issue {
            id: IssueId::general_comment(7),
            kind: IssueKind::GeneralComment {
                origin: BotKind::Codex,
            },
            body: body.to_owned(),
            url: String::new(),
            created_at: None,
            resolved: false,
            outdated: false,
            blocking: true,
        }
    }

    #[test]
    fn ids_do_not_collide_across_categories() {
        assert_ne!(IssueId::review_comment(42), IssueId::general_comment(42));
        assert_ne!(IssueId::general_comment(42), IssueId::check_run(42));
        assert_ne!(IssueId::check_run(42), IssueId::commit_status(42));
    }

    #[test]
    fn named_ids_never_collide_with_numeric_ids() {
        assert_ne!(IssueId::check_run_named("10"), IssueId::check_run(10));
        assert_ne!(IssueId::commit_status_named("10"), IssueId::commit_status(10));
    }

    #[test]
    fn named_ids_ignore_case_and_padding() {
        assert_eq!(
            IssueId::commit_status_named(" Lint "),
            IssueId::commit_status_named("lint")
        );
        assert_eq!(IssueId::check_run_named("Build"), IssueId::from("check-name:build"));
    }

    #[test]
    fn summary_skips_blank_lines_and_clips() {
        let issue = comment("\n\n  **Bug**: this overflows the buffer\nmore");
        assert_eq!(issue.summary(80), "**Bug**: this overflows the buffer");
        assert_eq!(issue.summary(8), "**Bug**…");
    }

    #[test]
    fn resolved_or_outdated_is_inactive() {
        let mut issue = comment("x");
        assert!(issue.is_active());
        issue.outdated = true;
        assert!(!issue.is_active());
    }
}
