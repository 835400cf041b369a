//! The poll step: fetch, normalize, diff, decide.
//!
//! [`poll_step`] is the pure core. It takes the retained [`PollState`] by
//! value together with one poll's worth of raw input and hands back the new
//! state with the [`PollOutcome`]. [`Watcher`] wraps it around an
//! [`EventSource`] and owns the state for the life of the process.
//!
//! # Degradation
//!
//! Each category (review comments, general comments, CI) is fetched on its
//! own. A failed category becomes "no data this poll": it contributes no
//! issues, is listed in [`PollSnapshot::degraded`], and marks the poll
//! incomplete so an outage can never read as "all clear". A failed primary
//! review fetch first falls back to the flat comment listing. Only
//! [`FetchError::NotFound`] is fatal.

use std::fmt;
use std::future::Future;

use tracing::{debug, info, warn};

use crate::ci::CiAggregate;
use crate::error::{FetchError, WatchError};
use crate::merge_queue::{MergeQueueStatus, QueueDisplay};
use crate::normalize::{Anomaly, Normalized, Normalizer};
use crate::policy::{self, Notification, PolicyInput};
use crate::raw::{CiReport, RawComment, RawReviewThread};
use crate::tracker::{self, PollState};
use crate::types::{Issue, IssueId};

/// The collaborator that talks to the review/CI platform.
///
/// Implementations own transport, auth, pagination and timeouts. Each call
/// answers one category for the watched pull request.
pub trait EventSource {
    /// Review comments grouped by thread, with resolution flags.
    fn fetch_review_threads(
        &self,
    ) -> impl Future<Output = Result<Vec<RawReviewThread>, FetchError>> + Send;

    /// Flat review comments; used when the thread query fails.
    fn fetch_review_comments(
        &self,
    ) -> impl Future<Output = Result<Vec<RawComment>, FetchError>> + Send;

    fn fetch_general_comments(
        &self,
    ) -> impl Future<Output = Result<Vec<RawComment>, FetchError>> + Send;

    fn fetch_ci_status(&self) -> impl Future<Output = Result<CiReport, FetchError>> + Send;
}

/// The three independently fetched input categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    ReviewComments,
    GeneralComments,
    Ci,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::ReviewComments => f.write_str("review comments"),
            Category::GeneralComments => f.write_str("general comments"),
            Category::Ci => f.write_str("CI status"),
        }
    }
}

/// A category that was not fetched at full fidelity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// Review threads failed; flat comments were used instead, so resolved
    /// threads may show up as active.
    ReviewFallback { reason: String },
    /// No data at all for this category this poll.
    Unavailable { category: Category, reason: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::ReviewFallback { reason } => {
                write!(f, "review threads unavailable ({reason}); resolution state may be stale")
            }
            Degradation::Unavailable { category, reason } => {
                write!(f, "could not check {category}: {reason}")
            }
        }
    }
}

/// Review input as it arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewInput {
    Threads(Vec<RawReviewThread>),
    Fallback(Vec<RawComment>),
    Unavailable,
}

/// One poll's raw data, after fetch failures have been absorbed.
#[derive(Debug, Clone, PartialEq)]
pub struct PollInputs {
    pub reviews: ReviewInput,
    pub general_comments: Option<Vec<RawComment>>,
    pub ci: Option<CiReport>,
    pub degraded: Vec<Degradation>,
}

/// What one poll looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    /// 1-based poll counter.
    pub poll: u64,
    pub is_first_poll: bool,
    pub active_issues: Vec<Issue>,
    /// Active issues not seen on any earlier poll, blocking or not.
    pub new_issues: Vec<Issue>,
    pub ci: CiAggregate,
    pub merge_queue: MergeQueueStatus,
    /// Resolved or outdated issues dropped this poll.
    pub suppressed: usize,
    pub degraded: Vec<Degradation>,
    pub anomalies: Vec<Anomaly>,
}

impl PollSnapshot {
    pub fn issue(&self, id: &IssueId) -> Option<&Issue> {
        self.active_issues.iter().find(|i| &i.id == id)
    }

    pub fn blocking_count(&self) -> usize {
        self.active_issues.iter().filter(|i| i.blocking).count()
    }

    pub fn queue_display(&self) -> QueueDisplay {
        self.merge_queue.display()
    }

    pub fn is_complete(&self) -> bool {
        !self
            .degraded
            .iter()
            .any(|d| matches!(d, Degradation::Unavailable { .. }))
    }
}

/// A snapshot together with the notifications it triggered.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub snapshot: PollSnapshot,
    pub notifications: Vec<Notification>,
}

impl PollOutcome {
    /// Feeds the snapshot, then each notification, to `observer`.
    pub fn dispatch(&self, observer: &mut impl WatchObserver) {
        observer.on_poll_result(&self.snapshot);
        for notification in &self.notifications {
            observer.on_notify(notification);
        }
    }
}

/// Consumer of poll results, typically a renderer.
pub trait WatchObserver {
    fn on_poll_result(&mut self, snapshot: &PollSnapshot);
    fn on_notify(&mut self, notification: &Notification);
}

/// Runs one poll against already-fetched inputs.
pub fn poll_step(
    mut state: PollState,
    normalizer: &Normalizer,
    inputs: PollInputs,
) -> (PollState, PollOutcome) {
    let mut normalized = Normalized::default();

    match &inputs.reviews {
        ReviewInput::Threads(threads) => normalizer.review_threads(threads, &mut normalized),
        ReviewInput::Fallback(comments) => {
            normalizer.review_comments_fallback(comments, &mut normalized)
        }
        ReviewInput::Unavailable => {}
    }
    if let Some(comments) = &inputs.general_comments {
        normalizer.general_comments(comments, &mut normalized);
    }
    let (ci, merge_queue) = match &inputs.ci {
        Some(report) => {
            normalizer.ci_failures(report, &mut normalized);
            let queue = MergeQueueStatus::from_report(report);
            if let Some(raw) = &queue.ambiguous {
                warn!(state = %raw, "unrecognised merge queue state");
                normalized.anomalies.push(Anomaly::UnknownQueueState { state: raw.clone() });
            }
            (CiAggregate::compute(report, normalizer.classifier()), queue)
        }
        None => (
            CiAggregate::default(),
            MergeQueueStatus::carried(state.last_queue_state),
        ),
    };

    let is_first_poll = state.is_first_poll();
    let complete = !inputs
        .degraded
        .iter()
        .any(|d| matches!(d, Degradation::Unavailable { .. }));
    let delta = tracker::diff(normalized.issues, state.seen_ids());

    let notifications = policy::evaluate(
        &mut state,
        PolicyInput {
            delta: &delta,
            ci: &ci,
            queue: &merge_queue,
            is_first_poll,
            complete,
        },
    );
    state.record_seen(&delta.active_issues);
    state.polls_completed += 1;

    info!(
        poll = state.polls_completed,
        active = delta.active_issues.len(),
        new = delta.new_issues.len(),
        ci = %ci,
        queue = %merge_queue.display(),
        complete,
        "poll complete"
    );
    for notification in &notifications {
        debug!(?notification, "notification");
    }

    let snapshot = PollSnapshot {
        poll: state.polls_completed,
        is_first_poll,
        active_issues: delta.active_issues,
        new_issues: delta.new_issues,
        ci,
        merge_queue,
        suppressed: normalized.suppressed,
        degraded: inputs.degraded,
        anomalies: normalized.anomalies,
    };
    (
        state,
        PollOutcome {
            snapshot,
            notifications,
        },
    )
}

/// Fetches every category concurrently, absorbing per-category failures.
pub async fn gather<S: EventSource>(source: &S) -> Result<PollInputs, WatchError> {
    let (reviews, general, ci) = tokio::join!(
        fetch_reviews(source),
        source.fetch_general_comments(),
        source.fetch_ci_status(),
    );

    let (reviews, review_degradation) = reviews?;
    let mut degraded: Vec<Degradation> = review_degradation.into_iter().collect();
    let general_comments = absorb(Category::GeneralComments, general, &mut degraded)?;
    let ci = absorb(Category::Ci, ci, &mut degraded)?;

    Ok(PollInputs {
        reviews,
        general_comments,
        ci,
        degraded,
    })
}

async fn fetch_reviews<S: EventSource>(
    source: &S,
) -> Result<(ReviewInput, Option<Degradation>), WatchError> {
    let primary = match source.fetch_review_threads().await {
        Ok(threads) => return Ok((ReviewInput::Threads(threads), None)),
        Err(FetchError::NotFound(msg)) => return Err(WatchError::TargetGone(msg)),
        Err(FetchError::Unavailable(reason)) => reason,
    };
    warn!(reason = %primary, "review thread fetch failed, falling back to flat comments");

    match source.fetch_review_comments().await {
        Ok(comments) => Ok((
            ReviewInput::Fallback(comments),
            Some(Degradation::ReviewFallback { reason: primary }),
        )),
        Err(FetchError::NotFound(msg)) => Err(WatchError::TargetGone(msg)),
        Err(FetchError::Unavailable(reason)) => {
            warn!(category = %Category::ReviewComments, %reason, "fetch failed, treating as empty");
            Ok((
                ReviewInput::Unavailable,
                Some(Degradation::Unavailable {
                    category: Category::ReviewComments,
                    reason,
                }),
            ))
        }
    }
}

fn absorb<T>(
    category: Category,
    result: Result<T, FetchError>,
    degraded: &mut Vec<Degradation>,
) -> Result<Option<T>, WatchError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(FetchError::NotFound(msg)) => Err(WatchError::TargetGone(msg)),
        Err(FetchError::Unavailable(reason)) => {
            warn!(%category, %reason, "fetch failed, treating as empty");
            degraded.push(Degradation::Unavailable { category, reason });
            Ok(None)
        }
    }
}

/// Owns the source and the retained state for one watched pull request.
pub struct Watcher<S> {
    source: S,
    normalizer: Normalizer,
    state: PollState,
    active: Vec<Issue>,
}

impl<S: EventSource> Watcher<S> {
    pub fn new(source: S, normalizer: Normalizer) -> Self {
        Self {
            source,
            normalizer,
            state: PollState::new(),
            active: Vec::new(),
        }
    }

    /// Runs one complete poll. On error the retained state is untouched.
    pub async fn poll(&mut self) -> Result<PollOutcome, WatchError> {
        let inputs = gather(&self.source).await?;
        let state = std::mem::take(&mut self.state);
        let (state, outcome) = poll_step(state, &self.normalizer, inputs);
        self.state = state;
        self.active.clone_from(&outcome.snapshot.active_issues);
        Ok(outcome)
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Looks up an issue in the most recent poll's active set.
    pub fn active_issue(&self, id: &IssueId) -> Option<&Issue> {
        self.active.iter().find(|i| &i.id == id)
    }

    pub fn active_issues(&self) -> &[Issue] {
        &self.active
    }
}
