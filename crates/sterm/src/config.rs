//! Application configuration, loaded from a JSON file with defaults
//! on any error: a broken config degrades to defaults rather than
//! refusing to start.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// Poll intervals and command settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Queue refresh interval (seconds). Queues change fast.
    pub queue_poll_secs: u64,
    /// Hardware (partitions + nodes) refresh interval (seconds).
    pub hardware_poll_secs: u64,
    /// Accounting-history refresh interval (seconds). sacct queries
    /// are costly; history changes slowly.
    pub history_poll_secs: u64,
    /// Wall-clock bound on any single external command (seconds).
    pub subprocess_timeout_secs: u64,
    /// Trailing window passed to the accounting query.
    pub history_window: String,
    /// Extra stderr patterns classified as "job not found".
    pub stderr_not_found: Vec<String>,
    /// Extra stderr patterns classified as "permission denied".
    pub stderr_permission: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_poll_secs: 3,
            hardware_poll_secs: 30,
            history_poll_secs: 60,
            subprocess_timeout_secs: 30,
            history_window: "now-7days".to_string(),
            stderr_not_found: Vec::new(),
            stderr_permission: Vec::new(),
        }
    }
}

impl Config {
    pub fn queue_interval(&self) -> Duration {
        Duration::from_secs(self.queue_poll_secs)
    }
    pub fn hardware_interval(&self) -> Duration {
        Duration::from_secs(self.hardware_poll_secs)
    }
    pub fn history_interval(&self) -> Duration {
        Duration::from_secs(self.history_poll_secs)
    }
    pub fn subprocess_timeout(&self) -> Duration {
        Duration::from_secs(self.subprocess_timeout_secs)
    }
}

/// Default config file location: $STERM_CONFIG, else
/// ~/.config/sterm/config.json.
pub fn default_config_path() -> Option<Utf8PathBuf> {
    if let Ok(path) = std::env::var("STERM_CONFIG") {
        return Some(Utf8PathBuf::from(path));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| Utf8PathBuf::from(home).join(".config/sterm/config.json"))
}

/// Load config, falling back to defaults when the file is missing or
/// malformed.
pub fn load_config(path: Option<&Utf8Path>) -> Config {
    let path = match path.map(Utf8Path::to_path_buf).or_else(default_config_path) {
        Some(p) => p,
        None => return Config::default(),
    };
    if !path.is_file() {
        return Config::default();
    }
    match std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(%path, error = %e, "ignoring unreadable config, using defaults");
            Config::default()
        }
    }
}

/// Default data directory for templates:
/// ~/.config/sterm/templates, overridable via $STERM_TEMPLATES_DIR.
pub fn templates_dir() -> Option<Utf8PathBuf> {
    if let Ok(dir) = std::env::var("STERM_TEMPLATES_DIR") {
        return Some(Utf8PathBuf::from(dir));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| Utf8PathBuf::from(home).join(".config/sterm/templates"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.queue_poll_secs, 3);
        assert_eq!(config.history_window, "now-7days");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = load_config(Some(Utf8Path::new("/nonexistent/config.json")));
        assert_eq!(config.queue_poll_secs, 3);
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"queue_poll_secs": 10, "history_window": "now-2days"}}"#).unwrap();
        let path = Utf8Path::from_path(file.path()).unwrap();

        let config = load_config(Some(path));
        assert_eq!(config.queue_poll_secs, 10);
        assert_eq!(config.history_window, "now-2days");
        // Unspecified fields keep their defaults
        assert_eq!(config.hardware_poll_secs, 30);
    }

    #[test]
    fn test_load_malformed_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();
        let path = Utf8Path::from_path(file.path()).unwrap();

        let config = load_config(Some(path));
        assert_eq!(config.queue_poll_secs, 3);
    }
}
