//! Run configuration.
//!
//! Settings come from an optional TOML file, then CLI flags or the `INPUT_*`
//! environment variables a GitHub Action receives. Later sources win. A
//! missing or empty file yields `Config::default()`; unknown keys are
//! ignored with a warning.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::FetchOptions;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("No feed URLs provided")]
    NoFeeds,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Settings for one merge run.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URLs, fetched and merged in this order.
    pub feeds: Vec<String>,

    /// Destination of the merged RSS document.
    pub output_file: PathBuf,

    /// Maximum number of items taken from each feed (0 = unlimited).
    pub limit: usize,

    /// Channel title of the merged feed.
    pub feed_title: String,

    /// Channel description of the merged feed.
    pub feed_description: String,

    /// Cap on the merged, sorted list. `None` keeps every item.
    pub max_items: Option<usize>,

    /// Number of feeds fetched concurrently.
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            output_file: PathBuf::from("combined_feed.xml"),
            limit: 10,
            feed_title: "Combined RSS Feed".to_string(),
            feed_description: "Merged feed generated by combine-rss-feeds action".to_string(),
            max_items: None,
            concurrency: 8,
            timeout_secs: 30,
        }
    }
}

/// Raw values from the command line or environment, applied on top of a
/// loaded [`Config`]. Blank values count as unset.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Newline-separated feed URLs.
    pub feeds: Option<String>,
    pub output_file: Option<String>,
    pub limit: Option<String>,
    pub feed_title: Option<String>,
    pub feed_description: Option<String>,
    /// `0` removes a cap set in the config file.
    pub max_items: Option<String>,
    pub concurrency: Option<String>,
    pub timeout_secs: Option<String>,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "feeds",
        "output_file",
        "limit",
        "feed_title",
        "feed_description",
        "max_items",
        "concurrency",
        "timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feeds = config.feeds.len(), "Loaded configuration");
        Ok(config)
    }

    /// Applies CLI/environment values on top of this configuration.
    ///
    /// Numeric values that do not parse, or that are out of range, are
    /// ignored with a warning and the previous value stays in effect.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(raw) = non_blank(overrides.feeds) {
            self.feeds = parse_feed_list(&raw);
        }
        if let Some(raw) = non_blank(overrides.output_file) {
            self.output_file = PathBuf::from(raw.trim());
        }
        if let Some(raw) = non_blank(overrides.feed_title) {
            self.feed_title = raw;
        }
        if let Some(raw) = non_blank(overrides.feed_description) {
            self.feed_description = raw;
        }
        if let Some(raw) = non_blank(overrides.limit) {
            if let Some(limit) = parse_positive(&raw, "limit") {
                self.limit = limit;
            }
        }
        if let Some(raw) = non_blank(overrides.max_items) {
            match raw.trim().parse::<usize>() {
                Ok(0) => self.max_items = None,
                Ok(cap) => self.max_items = Some(cap),
                Err(_) => {
                    tracing::warn!(setting = "max_items", value = %raw, "Ignoring invalid value");
                }
            }
        }
        if let Some(raw) = non_blank(overrides.concurrency) {
            if let Some(concurrency) = parse_positive(&raw, "concurrency") {
                self.concurrency = concurrency;
            }
        }
        if let Some(raw) = non_blank(overrides.timeout_secs) {
            if let Some(secs) = parse_positive(&raw, "timeout_secs") {
                self.timeout_secs = secs as u64;
            }
        }
    }

    /// Checks that the configuration describes a runnable merge.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds.is_empty() {
            return Err(ConfigError::NoFeeds);
        }
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            limit: self.limit,
            timeout: Duration::from_secs(self.timeout_secs),
            concurrency: self.concurrency,
            ..FetchOptions::default()
        }
    }
}

/// Splits a newline-separated URL list, trimming and dropping blank lines.
pub fn parse_feed_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_positive(raw: &str, setting: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!(setting = setting, value = %raw, "Ignoring invalid value, expected a positive integer");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
