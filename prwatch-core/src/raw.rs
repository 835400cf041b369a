//! Raw records as handed over by an [`EventSource`](crate::engine::EventSource).
//!
//! These mirror the platform payloads loosely: every field a source might
//! fail to supply is optional, and normalization decides what a missing
//! field means. All records deserialize from TOML so replay files and test
//! fixtures can be written by hand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment from either the review API or the conversation API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawComment {
    pub id: Option<u64>,
    pub author: Option<String>,
    pub body: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub path: Option<String>,
    /// Current line in the diff; cleared by the platform once the
    /// surrounding code changes.
    pub line: Option<u32>,
    /// Line the comment was originally written against.
    pub original_line: Option<u32>,
}

/// A review thread with the resolution flags only the richer API exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReviewThread {
    pub is_resolved: bool,
    pub is_outdated: bool,
    pub comments: Vec<RawComment>,
}

/// A check run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCheck {
    pub id: Option<u64>,
    pub name: String,
    /// `queued`, `in_progress`, `completed`, ...
    pub status: String,
    /// Set once `status` is `completed`.
    pub conclusion: Option<String>,
    pub html_url: Option<String>,
    pub details_url: Option<String>,
    pub title: Option<String>,
}

impl Default for RawCheck {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            status: "completed".to_owned(),
            conclusion: None,
            html_url: None,
            details_url: None,
            title: None,
        }
    }
}

impl RawCheck {
    /// The URL used both for display and for matching a commit status that
    /// reports the same job.
    pub fn resolved_url(&self) -> Option<&str> {
        self.html_url
            .as_deref()
            .or(self.details_url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// A legacy commit status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStatus {
    /// Platform id of this status record. A new one is issued every time
    /// the context reports.
    pub id: Option<u64>,
    pub context: String,
    /// `success`, `pending`, `failure` or `error`.
    pub state: String,
    pub target_url: Option<String>,
    pub description: Option<String>,
}

/// The pull request's merge-queue entry, when it has one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQueueEntry {
    /// `QUEUED`, `AWAITING_CHECKS`, `MERGEABLE`, `UNMERGEABLE`, `LOCKED`.
    pub state: String,
    /// Number of entries ahead of this one.
    pub position: Option<i64>,
}

/// Everything the CI query returns for one poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiReport {
    pub check_runs: Vec<RawCheck>,
    pub commit_statuses: Vec<RawStatus>,
    pub merge_queue_entry: Option<RawQueueEntry>,
    pub merged: bool,
}
