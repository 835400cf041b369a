//! Locating and loading the user's config file.

use std::path::{Path, PathBuf};

use prwatch_core::config::WatchConfig;

/// Returns the path to the prwatch config file.
///
/// Prefers `$XDG_CONFIG_HOME/prwatch/config.toml`; falls back to
/// `~/.config/prwatch/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("prwatch").join("config.toml")
}

/// Loads `explicit`, or the default config path when `None`.
///
/// A missing file yields the defaults. An unreadable or invalid file is a
/// soft failure: the error goes to stderr and the defaults are used, so a
/// typo in the config never stops a watch from starting.
pub fn load_config(explicit: Option<&Path>) -> WatchConfig {
    let path = explicit.map_or_else(config_path, Path::to_path_buf);
    match WatchConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("prwatch: {e}; using defaults");
            WatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_secs = 7\n").unwrap();
        assert_eq!(load_config(Some(&path)).poll_interval_secs, 7);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_secs = \"soon\"\n").unwrap();
        assert_eq!(load_config(Some(&path)), WatchConfig::default());
    }
}
