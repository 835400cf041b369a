//! Issue aggregation and notification engine for a watched pull request.
//!
//! Each poll merges review comments, conversation comments and CI results
//! into one list of [`types::Issue`]s with stable ids, diffs it against what
//! earlier polls saw, and decides which transitions deserve a notification.
//! Fetching and rendering are left to the caller: implement
//! [`engine::EventSource`] to supply data and [`engine::WatchObserver`] to
//! consume results.

pub mod ci;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge_queue;
pub mod normalize;
pub mod policy;
pub mod raw;
pub mod scheduler;
pub mod tracker;
pub mod types;

pub use engine::{EventSource, PollOutcome, PollSnapshot, WatchObserver, Watcher};
pub use error::{FetchError, WatchError};
pub use policy::Notification;
pub use types::{Issue, IssueId};
