//! CI outcome parsing and the per-poll CI aggregate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classify::BlockingClassifier;
use crate::raw::{CiReport, RawCheck, RawStatus};

/// Where a single CI job stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiOutcome {
    Pending,
    Passed,
    Failed,
    /// A state or conclusion we do not recognise. Treated as non-blocking
    /// and reported as an anomaly rather than guessed at.
    Unknown(String),
}

/// Outcome of a check run, from its `status` and `conclusion`.
pub fn check_outcome(check: &RawCheck) -> CiOutcome {
    let status = check.status.trim().to_lowercase();
    match status.as_str() {
        "queued" | "in_progress" | "pending" | "waiting" | "requested" => CiOutcome::Pending,
        "completed" => match check.conclusion.as_deref().map(str::to_lowercase) {
            Some(c) => match c.as_str() {
                "success" | "neutral" | "skipped" => CiOutcome::Passed,
                "failure" | "cancelled" | "timed_out" | "action_required" | "startup_failure" => {
                    CiOutcome::Failed
                }
                _ => CiOutcome::Unknown(c),
            },
            None => CiOutcome::Unknown("completed without conclusion".to_owned()),
        },
        _ => CiOutcome::Unknown(status),
    }
}

/// Outcome of a commit status, from its `state`.
pub fn status_outcome(status: &RawStatus) -> CiOutcome {
    let state = status.state.trim().to_lowercase();
    match state.as_str() {
        "success" => CiOutcome::Passed,
        "pending" => CiOutcome::Pending,
        "failure" | "error" => CiOutcome::Failed,
        _ => CiOutcome::Unknown(state),
    }
}

/// Whether `status` reports the same job as `check`: same resolved URL, or a
/// context equal to the check name ignoring case.
pub fn status_duplicates_check(status: &RawStatus, check_name: &str, check_url: Option<&str>) -> bool {
    let same_url = match (status.target_url.as_deref(), check_url) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    };
    same_url || status.context.trim().eq_ignore_ascii_case(check_name.trim())
}

/// Whether `status` is folded into one of `checks` rather than standing as a
/// job of its own. A mirroring status is folded unless it fails while the
/// check run it mirrors does not; that disagreement stays visible.
///
/// Both the aggregate and the issue list go through here, so a failing
/// status counts toward `failed_blocking` exactly when it is listed.
pub fn status_folded(status: &RawStatus, checks: &[RawCheck]) -> bool {
    let failed = status_outcome(status) == CiOutcome::Failed;
    checks.iter().any(|check| {
        status_duplicates_check(status, &check.name, check.resolved_url())
            && (!failed || check_outcome(check) == CiOutcome::Failed)
    })
}

/// Snapshot of CI health for one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiAggregate {
    pub total: usize,
    /// Blocking jobs still running.
    pub pending: usize,
    pub passed_blocking: usize,
    pub failed_blocking: usize,
    pub failed_non_blocking: usize,
    /// Jobs in a state we could not classify.
    pub unknown: usize,
    pub all_green: bool,
}

impl CiAggregate {
    /// Counts every check run plus every commit status that is not folded
    /// into a check run.
    pub fn compute(report: &CiReport, classifier: &BlockingClassifier) -> Self {
        let statuses = report
            .commit_statuses
            .iter()
            .filter(|s| !status_folded(s, &report.check_runs));

        let results = report
            .check_runs
            .iter()
            .map(|c| (c.name.as_str(), check_outcome(c)))
            .chain(statuses.map(|s| (s.context.as_str(), status_outcome(s))));

        let mut agg = CiAggregate::default();
        for (name, outcome) in results {
            agg.total += 1;
            let blocking = classifier.is_blocking(name);
            match outcome {
                CiOutcome::Pending if blocking => agg.pending += 1,
                CiOutcome::Pending => {}
                CiOutcome::Passed if blocking => agg.passed_blocking += 1,
                CiOutcome::Passed => {}
                CiOutcome::Failed if blocking => agg.failed_blocking += 1,
                CiOutcome::Failed => agg.failed_non_blocking += 1,
                CiOutcome::Unknown(_) => agg.unknown += 1,
            }
        }
        agg.all_green = agg.total > 0 && agg.pending == 0 && agg.failed_blocking == 0;
        agg
    }
}

impl fmt::Display for CiAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total == 0 {
            return f.write_str("CI: no checks");
        }
        let state = if self.all_green {
            "green"
        } else if self.failed_blocking > 0 {
            "red"
        } else {
            "running"
        };
        write!(
            f,
            "CI {state}: {} passed, {} pending, {} failed",
            self.passed_blocking, self.pending, self.failed_blocking
        )?;
        if self.failed_non_blocking > 0 {
            write!(f, " (+{} non-blocking)", self.failed_non_blocking)?;
        }
        if self.unknown > 0 {
            write!(f, " ({} unknown)", self.unknown)?;
        }
        Ok(())
    }
}
