//! Integration test for the watcher poll lifecycle.
//!
//! Drives a `Watcher` through scripted polls: first-poll suppression,
//! recovery to ready, the review fallback path, category outages, fatal
//! target loss, and observer dispatch.

use std::sync::{Arc, Mutex};

use prwatch_core::engine::{Category, Degradation};
use prwatch_core::raw::{CiReport, RawCheck, RawComment, RawReviewThread, RawStatus};
use prwatch_core::{
    EventSource, FetchError, IssueId, Notification, PollSnapshot, WatchError, WatchObserver,
    Watcher,
};

#[derive(Debug, Clone)]
struct Script {
    threads: Result<Vec<RawReviewThread>, FetchError>,
    flat: Result<Vec<RawComment>, FetchError>,
    general: Result<Vec<RawComment>, FetchError>,
    ci: Result<CiReport, FetchError>,
}

impl Script {
    fn new(threads: Vec<RawReviewThread>, ci: CiReport) -> Self {
        Self {
            threads: Ok(threads),
            flat: Ok(Vec::new()),
            general: Ok(Vec::new()),
            ci: Ok(ci),
        }
    }
}

#[derive(Clone)]
struct ScriptedSource(Arc<Mutex<Script>>);

impl ScriptedSource {
    fn set(&self, script: Script) {
        *self.0.lock().unwrap() = script;
    }
}

impl EventSource for ScriptedSource {
    async fn fetch_review_threads(&self) -> Result<Vec<RawReviewThread>, FetchError> {
        self.0.lock().unwrap().threads.clone()
    }

    async fn fetch_review_comments(&self) -> Result<Vec<RawComment>, FetchError> {
        self.0.lock().unwrap().flat.clone()
    }

    async fn fetch_general_comments(&self) -> Result<Vec<RawComment>, FetchError> {
        self.0.lock().unwrap().general.clone()
    }

    async fn fetch_ci_status(&self) -> Result<CiReport, FetchError> {
        self.0.lock().unwrap().ci.clone()
    }
}

fn watcher(script: Script) -> (Watcher<ScriptedSource>, ScriptedSource) {
    let source = ScriptedSource(Arc::new(Mutex::new(script)));
    let watcher = Watcher::new(source.clone(), Default::default());
    (watcher, source)
}

fn bot(id: u64) -> RawComment {
    RawComment {
        id: Some(id),
        author: Some("cursor[bot]".to_owned()),
        body: format!("Bug: finding {id}"),
        url: format!("https://example.test/pull/1#discussion_r{id}"),
        path: Some("src/lib.rs".to_owned()),
        line: Some(12),
        original_line: Some(12),
        ..RawComment::default()
    }
}

fn threads(resolved: bool, ids: &[u64]) -> Vec<RawReviewThread> {
    ids.iter()
        .map(|id| RawReviewThread {
            is_resolved: resolved,
            is_outdated: false,
            comments: vec![bot(*id)],
        })
        .collect()
}

fn ci(conclusion: &str) -> CiReport {
    CiReport {
        check_runs: vec![RawCheck {
            id: Some(501),
            name: "test".to_owned(),
            conclusion: Some(conclusion.to_owned()),
            html_url: Some("https://ci.test/501".to_owned()),
            ..RawCheck::default()
        }],
        ..CiReport::default()
    }
}

#[tokio::test]
async fn first_poll_is_silent_then_recovery_fires_ready_once() {
    // Scenario A: two blocking comments, CI red.
    let (mut watcher, source) = watcher(Script::new(threads(false, &[11, 12]), ci("failure")));
    let first = watcher.poll().await.unwrap();
    assert!(first.snapshot.is_first_poll);
    assert_eq!(first.snapshot.new_issues.len(), 3);
    assert!(first.notifications.is_empty(), "initial burst is suppressed");
    assert!(watcher.state().has_seen(&IssueId::review_comment(11)));
    assert!(watcher.state().has_seen(&IssueId::review_comment(12)));

    // Scenario B: both threads resolved, CI green.
    source.set(Script::new(threads(true, &[11, 12]), ci("success")));
    let second = watcher.poll().await.unwrap();
    assert!(second.snapshot.active_issues.is_empty());
    assert!(second.snapshot.ci.all_green);
    assert_eq!(second.notifications, vec![Notification::ReadyToMerge]);

    // Steady state: no repeat.
    let third = watcher.poll().await.unwrap();
    assert!(third.notifications.is_empty());
    assert_eq!(watcher.state().polls_completed, 3);
}

#[tokio::test]
async fn resolved_issue_that_reappears_is_not_announced_again() {
    let (mut watcher, source) = watcher(Script::new(threads(false, &[1]), ci("success")));
    watcher.poll().await.unwrap();

    source.set(Script::new(threads(false, &[1, 2]), ci("success")));
    let second = watcher.poll().await.unwrap();
    let announced: Vec<_> = second
        .notifications
        .iter()
        .flat_map(|n| match n {
            Notification::NewIssues(issues) => {
                issues.iter().map(|i| i.id.clone()).collect::<Vec<_>>()
            }
            _ => Vec::new(),
        })
        .collect();
    assert_eq!(announced, vec![IssueId::review_comment(2)]);

    source.set(Script::new(threads(true, &[1, 2]), ci("success")));
    watcher.poll().await.unwrap();

    // The platform flaps and reports both threads unresolved again.
    source.set(Script::new(threads(false, &[1, 2]), ci("success")));
    let flapped = watcher.poll().await.unwrap();
    assert!(flapped.snapshot.new_issues.is_empty());
    assert!(!flapped
        .notifications
        .iter()
        .any(|n| matches!(n, Notification::NewIssues(_))));
}

#[tokio::test]
async fn thread_failure_falls_back_to_flat_comments() {
    let mut moved = bot(8);
    moved.line = None;
    let script = Script {
        threads: Err(FetchError::Unavailable("graphql 502".to_owned())),
        flat: Ok(vec![bot(7), moved]),
        general: Ok(Vec::new()),
        ci: Ok(ci("success")),
    };
    let (mut watcher, _source) = watcher(script);
    let outcome = watcher.poll().await.unwrap();

    let ids: Vec<_> = outcome
        .snapshot
        .active_issues
        .iter()
        .map(|i| i.id.as_str().to_owned())
        .collect();
    assert_eq!(ids, ["review:7"]);
    assert!(matches!(
        outcome.snapshot.degraded.as_slice(),
        [Degradation::ReviewFallback { .. }]
    ));
    assert!(outcome.snapshot.is_complete());
}

#[tokio::test]
async fn category_outage_degrades_without_false_all_clear() {
    let (mut watcher, source) = watcher(Script::new(threads(false, &[3]), ci("failure")));
    watcher.poll().await.unwrap();

    // Comments are resolved but CI cannot be read: no ready notification.
    source.set(Script {
        ci: Err(FetchError::Unavailable("timeout".to_owned())),
        ..Script::new(threads(true, &[3]), CiReport::default())
    });
    let outage = watcher.poll().await.unwrap();
    assert!(outage.notifications.is_empty());
    assert_eq!(
        outage.snapshot.degraded,
        vec![Degradation::Unavailable {
            category: Category::Ci,
            reason: "timeout".to_owned()
        }]
    );
    assert_eq!(outage.snapshot.ci.total, 0);

    // Once CI answers green, ready fires.
    source.set(Script::new(threads(true, &[3]), ci("success")));
    let recovered = watcher.poll().await.unwrap();
    assert_eq!(recovered.notifications, vec![Notification::ReadyToMerge]);
}

#[tokio::test]
async fn duplicate_status_reports_one_ci_issue() {
    let mut report = ci("failure");
    report.check_runs[0].name = "lint".to_owned();
    report.commit_statuses.push(RawStatus {
        context: "lint".to_owned(),
        state: "failure".to_owned(),
        target_url: Some("https://ci.test/501".to_owned()),
        ..RawStatus::default()
    });
    let (mut watcher, _source) = watcher(Script::new(Vec::new(), report));
    let outcome = watcher.poll().await.unwrap();
    assert_eq!(outcome.snapshot.active_issues.len(), 1);
    assert_eq!(outcome.snapshot.ci.failed_blocking, 1);
}

#[tokio::test]
async fn missing_target_is_fatal_and_leaves_state_alone() {
    let (mut watcher, source) = watcher(Script::new(threads(false, &[1]), ci("success")));
    watcher.poll().await.unwrap();

    source.set(Script {
        general: Err(FetchError::NotFound("pull request 1".to_owned())),
        ..Script::new(Vec::new(), ci("success"))
    });
    let err = watcher.poll().await.unwrap_err();
    assert_eq!(err, WatchError::TargetGone("pull request 1".to_owned()));
    assert_eq!(watcher.state().polls_completed, 1);
    assert!(watcher.active_issue(&IssueId::review_comment(1)).is_some());
}

#[tokio::test]
async fn active_issue_lookup_tracks_latest_poll() {
    let (mut watcher, source) = watcher(Script::new(threads(false, &[4]), ci("success")));
    watcher.poll().await.unwrap();
    let issue = watcher.active_issue(&IssueId::from("review:4")).unwrap();
    assert_eq!(issue.location().map(|l| l.to_string()).as_deref(), Some("src/lib.rs:12"));

    source.set(Script::new(threads(true, &[4]), ci("success")));
    let outcome = watcher.poll().await.unwrap();
    assert!(watcher.active_issue(&IssueId::review_comment(4)).is_none());
    assert!(outcome.snapshot.issue(&IssueId::review_comment(4)).is_none());
}

#[derive(Default)]
struct Recorder {
    polls: Vec<u64>,
    notifications: Vec<Notification>,
}

impl WatchObserver for Recorder {
    fn on_poll_result(&mut self, snapshot: &PollSnapshot) {
        self.polls.push(snapshot.poll);
    }

    fn on_notify(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
}

#[tokio::test]
async fn outcomes_dispatch_snapshot_then_notifications() {
    let (mut watcher, source) = watcher(Script::new(threads(false, &[9]), ci("failure")));
    let mut recorder = Recorder::default();
    watcher.poll().await.unwrap().dispatch(&mut recorder);

    source.set(Script::new(Vec::new(), ci("success")));
    watcher.poll().await.unwrap().dispatch(&mut recorder);

    assert_eq!(recorder.polls, vec![1, 2]);
    assert_eq!(recorder.notifications, vec![Notification::ReadyToMerge]);
}

fn new_issue_ids(notifications: &[Notification]) -> Vec<IssueId> {
    notifications
        .iter()
        .flat_map(|n| match n {
            Notification::NewIssues(issues) => {
                issues.iter().map(|i| i.id.clone()).collect::<Vec<_>>()
            }
            _ => Vec::new(),
        })
        .collect()
}

#[tokio::test]
async fn ready_rearms_after_a_new_blocking_issue() {
    let (mut watcher, source) = watcher(Script::new(threads(false, &[1]), ci("success")));
    watcher.poll().await.unwrap();

    source.set(Script::new(threads(true, &[1]), ci("success")));
    let clean = watcher.poll().await.unwrap();
    assert_eq!(clean.notifications, vec![Notification::ReadyToMerge]);

    let mut reopened = threads(true, &[1]);
    reopened.extend(threads(false, &[2]));
    source.set(Script::new(reopened, ci("success")));
    let blocked = watcher.poll().await.unwrap();
    assert_eq!(new_issue_ids(&blocked.notifications), vec![IssueId::review_comment(2)]);
    assert!(!blocked.notifications.contains(&Notification::ReadyToMerge));
    assert!(!watcher.state().last_ready_notified);

    source.set(Script::new(threads(true, &[1, 2]), ci("success")));
    let clean_again = watcher.poll().await.unwrap();
    assert_eq!(clean_again.notifications, vec![Notification::ReadyToMerge]);
}

#[tokio::test]
async fn commit_status_that_fails_again_is_announced_again() {
    // Each report of a context is a new status record with a new id.
    let legacy = |id: u64, state: &str| {
        let mut report = ci("success");
        report.commit_statuses.push(RawStatus {
            id: Some(id),
            context: "ci/legacy".to_owned(),
            state: state.to_owned(),
            ..RawStatus::default()
        });
        Script::new(Vec::new(), report)
    };

    let (mut watcher, source) = watcher(legacy(1, "success"));
    assert!(watcher.poll().await.unwrap().notifications.is_empty());

    source.set(legacy(2, "failure"));
    let failed = watcher.poll().await.unwrap();
    assert_eq!(new_issue_ids(&failed.notifications), vec![IssueId::commit_status(2)]);

    source.set(legacy(3, "success"));
    let recovered = watcher.poll().await.unwrap();
    assert_eq!(recovered.notifications, vec![Notification::ReadyToMerge]);

    source.set(legacy(4, "failure"));
    let failed_again = watcher.poll().await.unwrap();
    assert_eq!(new_issue_ids(&failed_again.notifications), vec![IssueId::commit_status(4)]);
    assert_eq!(failed_again.snapshot.ci.failed_blocking, 1);

    source.set(legacy(5, "success"));
    let recovered_again = watcher.poll().await.unwrap();
    assert_eq!(recovered_again.notifications, vec![Notification::ReadyToMerge]);
}
