//! Watcher settings.
//!
//! Every field has a default, so an absent or empty file is a valid
//! configuration. Caller-supplied bot names and non-blocking patterns extend
//! the built-in lists rather than replacing them.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::classify::BlockingClassifier;
use crate::error::ConfigError;
use crate::normalize::{BotRoster, Normalizer};

/// Default seconds between polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub poll_interval_secs: u64,
    /// Extra author-name fragments treated as review bots.
    pub bot_authors: Vec<String>,
    /// Extra job-name fragments treated as non-blocking.
    pub non_blocking_checks: Vec<String>,
    /// Stop watching once the pull request has merged.
    pub exit_on_merge: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            bot_authors: Vec::new(),
            non_blocking_checks: Vec::new(),
            exit_on_merge: true,
        }
    }
}

impl WatchConfig {
    /// Poll interval, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn roster(&self) -> BotRoster {
        BotRoster::new(&self.bot_authors)
    }

    pub fn classifier(&self) -> BlockingClassifier {
        BlockingClassifier::new(&self.non_blocking_checks)
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.roster(), self.classifier())
    }

    /// Parses `raw` as TOML; `path` is only used for error messages.
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads `path`, returning the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_owned(),
                source,
            }),
        }
    }
}
