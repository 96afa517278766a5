//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$INBOX2HTML_CONFIG` (environment variable)
//! 2. `~/.config/inbox2html/config.toml` (Linux/macOS)
//!    `%APPDATA%\inbox2html\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Credentials and the output directory are not part of the file; they come
//! from the `INPUT_*` environment variables or command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::export::html::DEFAULT_MAX_STEM_LEN;
use crate::index::DEFAULT_INDEX_FILE;
use crate::mailbox::imap::DEFAULT_PORT;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mail server settings.
    pub imap: ImapConfig,
    /// Output file settings.
    pub output: OutputConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Mail server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapConfig {
    /// IMAPS port.
    pub port: u16,
    /// Mailbox to read.
    pub mailbox: String,
    /// Network timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Name of the message index inside the output directory.
    pub index_file_name: String,
    /// Maximum length in bytes of a rendered file's name, without `.html`.
    pub max_filename_len: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            mailbox: "INBOX".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            index_file_name: DEFAULT_INDEX_FILE.to_string(),
            max_filename_len: DEFAULT_MAX_STEM_LEN,
        }
    }
}

impl ImapConfig {
    /// Network timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("INBOX2HTML_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("inbox2html").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inbox2html")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("inbox2html.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.imap.port, 993);
        assert_eq!(cfg.imap.mailbox, "INBOX");
        assert_eq!(cfg.imap.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.output.index_file_name, "dump.json");
        assert_eq!(cfg.output.max_filename_len, 200);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.imap.mailbox, cfg.imap.mailbox);
        assert_eq!(parsed.output.index_file_name, cfg.output.index_file_name);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[imap]
mailbox = "Archive"
timeout_secs = 0
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.imap.mailbox, "Archive");
        assert_eq!(cfg.imap.timeout(), None);
        assert_eq!(cfg.imap.port, 993);
        assert_eq!(cfg.output.max_filename_len, 200);
    }

    #[test]
    fn test_log_file_in_cache_dir() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/i2h"));
        assert_eq!(log_file_path(&cfg), PathBuf::from("/tmp/i2h/inbox2html.log"));
    }
}
