//! Maps raw platform records onto canonical [`Issue`]s.
//!
//! One function per source keeps each API's quirks apart:
//!
//! - [`Normalizer::review_threads`]: the primary review path; drops comments
//!   on resolved or outdated threads.
//! - [`Normalizer::review_comments_fallback`]: the degraded path without
//!   thread flags; treats "line cleared but original line set" as outdated.
//!   A degraded run may show comments a full run would have suppressed.
//! - [`Normalizer::general_comments`]: top-level conversation comments.
//! - [`Normalizer::ci_failures`]: failing check runs and commit statuses,
//!   with statuses that mirror a failing check run folded away.
//!
//! Every issue passes through [`Normalized::push`], which enforces that the
//! output has no duplicate ids and contains no resolved or outdated issues.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::ci::{check_outcome, status_folded, status_outcome, CiOutcome};
use crate::classify::BlockingClassifier;
use crate::raw::{CiReport, RawComment, RawReviewThread};
use crate::types::{BotKind, CiSource, Issue, IssueId, IssueKind, Location};

/// Author-name fragments recognised as review bots.
pub const DEFAULT_BOT_ROSTER: &[&str] = &["cursor", "codex", "copilot", "coderabbit"];

/// The set of authors whose comments count as actionable feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotRoster {
    names: Vec<String>,
}

impl Default for BotRoster {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl BotRoster {
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = DEFAULT_BOT_ROSTER.iter().map(|n| (*n).to_owned()).collect();
        for n in extra {
            let n = n.as_ref().trim().to_lowercase();
            if !n.is_empty() && !names.contains(&n) {
                names.push(n);
            }
        }
        Self { names }
    }

    /// Returns the bot kind for `author`, or `None` for humans.
    pub fn classify(&self, author: &str) -> Option<BotKind> {
        let author = author.to_lowercase();
        if !self.names.iter().any(|n| author.contains(n.as_str())) {
            return None;
        }
        if author.contains("cursor") {
            Some(BotKind::Cursorbot)
        } else if author.contains("codex") {
            Some(BotKind::Codex)
        } else {
            Some(BotKind::Other)
        }
    }
}

/// Something in a batch that could not be taken at face value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// A record missing a field required to build an issue; it was skipped.
    Malformed { source: &'static str, detail: String },
    /// A CI job in a state we do not recognise; counted as non-blocking.
    UnknownCiState { name: String, state: String },
    /// A merge-queue state we do not recognise; shown as unmergeable.
    UnknownQueueState { state: String },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::Malformed { source, detail } => {
                write!(f, "skipped malformed {source} record: {detail}")
            }
            Anomaly::UnknownCiState { name, state } => {
                write!(f, "CI job {name:?} in unrecognised state {state:?}")
            }
            Anomaly::UnknownQueueState { state } => {
                write!(f, "merge queue in unrecognised state {state:?}")
            }
        }
    }
}

/// Accumulated output of one poll's normalization.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub issues: Vec<Issue>,
    /// Issues dropped because they were resolved or outdated.
    pub suppressed: usize,
    pub anomalies: Vec<Anomaly>,
    ids: HashSet<IssueId>,
}

impl Normalized {
    /// Adds `issue` unless it is inactive or its id is already present.
    pub fn push(&mut self, issue: Issue) {
        if !issue.is_active() {
            self.suppressed += 1;
            return;
        }
        if self.ids.insert(issue.id.clone()) {
            self.issues.push(issue);
        } else {
            debug!(id = %issue.id, "dropping duplicate issue");
        }
    }

    fn malformed(&mut self, source: &'static str, detail: String) {
        warn!(source, %detail, "skipping malformed record");
        self.anomalies.push(Anomaly::Malformed { source, detail });
    }
}

/// Stateless mapping from raw records to issues.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    roster: BotRoster,
    classifier: BlockingClassifier,
}

impl Normalizer {
    pub fn new(roster: BotRoster, classifier: BlockingClassifier) -> Self {
        Self { roster, classifier }
    }

    pub fn classifier(&self) -> &BlockingClassifier {
        &self.classifier
    }

    /// Primary review path: thread flags are authoritative.
    pub fn review_threads(&self, threads: &[RawReviewThread], out: &mut Normalized) {
        for thread in threads {
            for comment in &thread.comments {
                if let Some(issue) =
                    self.review_issue(comment, thread.is_resolved, thread.is_outdated, out)
                {
                    out.push(issue);
                }
            }
        }
    }

    /// Degraded review path: no thread flags, so a cleared line position on a
    /// comment that once had one stands in for "outdated".
    pub fn review_comments_fallback(&self, comments: &[RawComment], out: &mut Normalized) {
        for comment in comments {
            let outdated = comment.line.is_none() && comment.original_line.is_some();
            if let Some(issue) = self.review_issue(comment, false, outdated, out) {
                out.push(issue);
            }
        }
    }

    pub fn general_comments(&self, comments: &[RawComment], out: &mut Normalized) {
        for comment in comments {
            let Some((id, origin)) = self.identify(comment, "general comment", out) else {
                continue;
            };
            out.push(Issue {
                id: IssueId::general_comment(id),
                kind: IssueKind::GeneralComment { origin },
                body: comment.body.clone(),
                url: comment.url.clone(),
                created_at: comment.created_at,
                resolved: false,
                outdated: false,
                blocking: true,
            });
        }
    }

    /// One issue per failing check run and per failing commit status that
    /// does not mirror a failing check run.
    pub fn ci_failures(&self, report: &CiReport, out: &mut Normalized) {
        for check in &report.check_runs {
            if check.name.trim().is_empty() {
                out.malformed("check run", format!("check run {:?} has no name", check.id));
                continue;
            }
            match check_outcome(check) {
                CiOutcome::Failed => {}
                CiOutcome::Unknown(state) => {
                    warn!(name = %check.name, %state, "unrecognised check run state");
                    out.anomalies.push(Anomaly::UnknownCiState {
                        name: check.name.clone(),
                        state,
                    });
                    continue;
                }
                CiOutcome::Pending | CiOutcome::Passed => continue,
            }
            let id = match check.id {
                Some(id) => IssueId::check_run(id),
                None => IssueId::check_run_named(&check.name),
            };
            let conclusion = check.conclusion.as_deref().unwrap_or("failure");
            out.push(Issue {
                id,
                kind: IssueKind::CiFailure {
                    name: check.name.clone(),
                    source: CiSource::CheckRun,
                },
                body: check
                    .title
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", check.name, conclusion)),
                url: check.resolved_url().unwrap_or_default().to_owned(),
                created_at: None,
                resolved: false,
                outdated: false,
                blocking: self.classifier.is_blocking(&check.name),
            });
        }

        for status in &report.commit_statuses {
            if status.context.trim().is_empty() {
                out.malformed("commit status", "commit status has no context".to_owned());
                continue;
            }
            match status_outcome(status) {
                CiOutcome::Failed => {}
                CiOutcome::Unknown(state) => {
                    warn!(context = %status.context, %state, "unrecognised commit status state");
                    out.anomalies.push(Anomaly::UnknownCiState {
                        name: status.context.clone(),
                        state,
                    });
                    continue;
                }
                CiOutcome::Pending | CiOutcome::Passed => continue,
            }
            if status_folded(status, &report.check_runs) {
                debug!(context = %status.context, "commit status mirrors a check run");
                continue;
            }
            out.push(Issue {
                id: match status.id {
                    Some(id) => IssueId::commit_status(id),
                    None => IssueId::commit_status_named(&status.context),
                },
                kind: IssueKind::CiFailure {
                    name: status.context.clone(),
                    source: CiSource::CommitStatus,
                },
                body: status
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", status.context, status.state)),
                url: status.target_url.clone().unwrap_or_default(),
                created_at: None,
                resolved: false,
                outdated: false,
                blocking: self.classifier.is_blocking(&status.context),
            });
        }
    }

    fn review_issue(
        &self,
        comment: &RawComment,
        resolved: bool,
        outdated: bool,
        out: &mut Normalized,
    ) -> Option<Issue> {
        let (id, origin) = self.identify(comment, "review comment", out)?;
        let location = comment.path.as_ref().map(|path| Location {
            path: path.clone(),
            line: comment.line.or(comment.original_line),
        });
        Some(Issue {
            id: IssueId::review_comment(id),
            kind: IssueKind::ReviewComment { origin, location },
            body: comment.body.clone(),
            url: comment.url.clone(),
            created_at: comment.created_at,
            resolved,
            outdated,
            blocking: true,
        })
    }

    /// Returns the comment id and bot kind, or `None` when the comment is
    /// from a human or is missing its id or author.
    fn identify(
        &self,
        comment: &RawComment,
        source: &'static str,
        out: &mut Normalized,
    ) -> Option<(u64, BotKind)> {
        let Some(author) = comment.author.as_deref().filter(|a| !a.trim().is_empty()) else {
            out.malformed(source, format!("comment {:?} has no author", comment.id));
            return None;
        };
        let origin = self.roster.classify(author)?;
        let Some(id) = comment.id else {
            out.malformed(source, format!("comment by {author} has no id"));
            return None;
        };
        Some((id, origin))
    }
}
