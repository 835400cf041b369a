//! Replay event source.
//!
//! Reads a TOML description of the pull request's current state and re-reads
//! it on every fetch, so editing the file between polls drives the watcher.
//! Each top-level section answers one query; an absent section means that
//! query failed this poll.
//!
//! ```toml
//! gone = false                 # true: the pull request was deleted
//!
//! [[review_threads]]           # primary review query
//! is_resolved = false
//! [[review_threads.comments]]
//! id = 101
//! author = "cursor[bot]"
//! body = "Bug: off-by-one"
//! path = "src/lib.rs"
//! line = 12
//!
//! [[review_comments]]          # fallback review query (no thread flags)
//! [[general_comments]]
//!
//! [ci]
//! merged = false
//! [[ci.check_runs]]
//! id = 9
//! name = "test"
//! conclusion = "failure"
//! [[ci.commit_statuses]]
//! id = 4001                    # new id every time the context reports
//! context = "ci/legacy"
//! state = "success"
//! [ci.merge_queue_entry]
//! state = "AWAITING_CHECKS"
//! position = 2
//! ```

use std::path::PathBuf;

use prwatch_core::raw::{CiReport, RawComment, RawReviewThread};
use prwatch_core::{EventSource, FetchError};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplayFile {
    gone: bool,
    review_threads: Option<Vec<RawReviewThread>>,
    review_comments: Option<Vec<RawComment>>,
    general_comments: Option<Vec<RawComment>>,
    ci: Option<CiReport>,
}

#[derive(Debug, Clone)]
pub struct ReplaySource {
    path: PathBuf,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<ReplayFile, FetchError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::Unavailable(format!("{}: {e}", self.path.display())))?;
        let file: ReplayFile = toml::from_str(&raw)
            .map_err(|e| FetchError::Unavailable(format!("{}: {e}", self.path.display())))?;
        if file.gone {
            return Err(FetchError::NotFound(self.path.display().to_string()));
        }
        Ok(file)
    }
}

fn section<T>(value: Option<T>, name: &str) -> Result<T, FetchError> {
    value.ok_or_else(|| FetchError::Unavailable(format!("no [{name}] section")))
}

impl EventSource for ReplaySource {
    async fn fetch_review_threads(&self) -> Result<Vec<RawReviewThread>, FetchError> {
        section(self.load().await?.review_threads, "review_threads")
    }

    async fn fetch_review_comments(&self) -> Result<Vec<RawComment>, FetchError> {
        section(self.load().await?.review_comments, "review_comments")
    }

    async fn fetch_general_comments(&self) -> Result<Vec<RawComment>, FetchError> {
        section(self.load().await?.general_comments, "general_comments")
    }

    async fn fetch_ci_status(&self) -> Result<CiReport, FetchError> {
        section(self.load().await?.ci, "ci")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> ReplaySource {
        let path = dir.path().join("pr.toml");
        std::fs::write(&path, body).unwrap();
        ReplaySource::new(path)
    }

    #[tokio::test]
    async fn sections_answer_their_queries() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = write(
            &dir,
            r#"
[[review_threads]]
is_resolved = true
[[review_threads.comments]]
id = 101
author = "cursor[bot]"
body = "Bug"
line = 4

[[general_comments]]
id = 7
author = "codex"

[ci]
[[ci.check_runs]]
id = 9
name = "test"
conclusion = "failure"
[ci.merge_queue_entry]
state = "QUEUED"
position = 2
"#,
        );

        let threads = source.fetch_review_threads().await.unwrap();
        assert!(threads[0].is_resolved);
        assert_eq!(threads[0].comments[0].id, Some(101));
        assert_eq!(source.fetch_general_comments().await.unwrap().len(), 1);

        let ci = source.fetch_ci_status().await.unwrap();
        assert_eq!(ci.check_runs[0].status, "completed");
        assert_eq!(ci.merge_queue_entry.unwrap().position, Some(2));
    }

    #[tokio::test]
    async fn missing_section_is_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = write(&dir, "[ci]\nmerged = true\n");
        assert!(matches!(
            source.fetch_review_comments().await,
            Err(FetchError::Unavailable(_))
        ));
        assert!(source.fetch_ci_status().await.unwrap().merged);
    }

    #[tokio::test]
    async fn unreadable_file_is_unavailable_not_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = ReplaySource::new(dir.path().join("absent.toml"));
        assert!(matches!(
            source.fetch_ci_status().await,
            Err(FetchError::Unavailable(_))
        ));

        let broken = write(&dir, "[ci\n");
        assert!(matches!(
            broken.fetch_ci_status().await,
            Err(FetchError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn gone_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = write(&dir, "gone = true\n");
        assert!(matches!(
            source.fetch_general_comments().await,
            Err(FetchError::NotFound(_))
        ));
    }
}
