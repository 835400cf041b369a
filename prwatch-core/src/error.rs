//! Error types for the watcher core.
//!
//! Only [`WatchError`] ever leaves a poll. Per-category [`FetchError`]s are
//! absorbed by the engine, which degrades that category to "no data this
//! poll" and carries on.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of one collaborator query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The query could not be answered this time; the next poll may succeed.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The watched pull request itself no longer exists.
    #[error("not found: {0}")]
    NotFound(String),
}

/// A condition that ends the watch loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchError {
    #[error("the watched pull request is gone: {0}")]
    TargetGone(String),
}

/// Configuration file problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
