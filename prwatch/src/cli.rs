//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;
use prwatch_core::config::WatchConfig;

/// Watch a pull request for bot review feedback, CI failures and merge-queue
/// changes, and speak up only when something changes.
#[derive(Debug, Parser)]
#[command(name = "prwatch", version)]
pub struct Cli {
    /// TOML file describing the pull request; re-read on every poll.
    #[arg(long, short = 's', value_name = "FILE")]
    pub source: PathBuf,

    /// Config file. Defaults to $XDG_CONFIG_HOME/prwatch/config.toml.
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between polls (minimum 1).
    #[arg(long, short = 'i', value_name = "SECS")]
    pub interval: Option<u64>,

    /// Extra author name treated as a review bot. Repeatable.
    #[arg(long = "bot", value_name = "NAME")]
    pub bots: Vec<String>,

    /// Extra CI job-name fragment treated as non-blocking. Repeatable.
    #[arg(long = "non-blocking", value_name = "PATTERN")]
    pub non_blocking: Vec<String>,

    /// Poll once, print the result and exit.
    #[arg(long)]
    pub once: bool,

    /// Log to stderr instead of .prwatch/watch.log.
    #[arg(long)]
    pub log_stderr: bool,

    /// Keep polling after the pull request has merged.
    #[arg(long)]
    pub keep_watching_after_merge: bool,
}

impl Cli {
    /// Layers command-line overrides onto the file configuration.
    pub fn apply(&self, mut config: WatchConfig) -> WatchConfig {
        if let Some(secs) = self.interval {
            config.poll_interval_secs = secs;
        }
        config.bot_authors.extend(self.bots.iter().cloned());
        config.non_blocking_checks.extend(self.non_blocking.iter().cloned());
        if self.keep_watching_after_merge {
            config.exit_on_merge = false;
        }
        config
    }
}
