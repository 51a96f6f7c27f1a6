//! Configuration management for the session replay recorder.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use crate::types::{ImagePrivacyLevel, TextAndInputPrivacyLevel, TouchPrivacyLevel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub privacy: PrivacyConfig,

    #[serde(default)]
    pub segment: SegmentConfig,

    #[serde(default)]
    pub resources: ResourcesConfig,

    #[serde(default)]
    pub classification: ClassificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether recording is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Source tag written into every segment
    #[serde(default = "default_source")]
    pub source: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: default_log_level(),
            source: default_source(),
        }
    }
}

/// What to do when a capture fires while the worker is still busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Skip the capture and accept staleness
    #[default]
    Drop,
    /// Queue the snapshot behind the in-flight one (up to `queue_depth`)
    Queue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Interval between captures in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Backpressure policy when the worker is busy
    #[serde(default)]
    pub backpressure: BackpressurePolicy,

    /// Maximum snapshots waiting for the worker with the `queue` policy
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            backpressure: BackpressurePolicy::default(),
            queue_depth: default_queue_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Session-wide default for text and inputs
    #[serde(default)]
    pub text_and_input: TextAndInputPrivacyLevel,

    /// Session-wide default for images
    #[serde(default)]
    pub image: ImagePrivacyLevel,

    /// Session-wide default for touches
    #[serde(default)]
    pub touch: TouchPrivacyLevel,

    /// Element identifiers to always hide (supports wildcards)
    #[serde(default = "default_hidden_identifiers")]
    pub hidden_identifiers: Vec<String>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            text_and_input: TextAndInputPrivacyLevel::default(),
            image: ImagePrivacyLevel::default(),
            touch: TouchPrivacyLevel::default(),
            hidden_identifiers: default_hidden_identifiers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Maximum records in one segment
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Maximum time span of one segment in milliseconds
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: i64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            max_duration_ms: default_max_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// Keep image payloads inline (base64) instead of extracting resources
    #[serde(default)]
    pub inline_images: bool,
}

/// How to choose between several specific classifications of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Strict priority order, the first specific result wins
    #[default]
    FirstMatch,
    /// Prefer the first result that keeps recording the subtree
    PreferRecordSubtree,
    /// Prefer the first result that ignores the subtree
    PreferIgnoreSubtree,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default)]
    pub tie_break: TieBreak,
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source() -> String {
    "rust".to_string()
}

fn default_interval_ms() -> u64 {
    100
}

fn default_queue_depth() -> usize {
    4
}

fn default_max_records() -> usize {
    500
}

fn default_max_duration_ms() -> i64 {
    30_000
}

fn default_hidden_identifiers() -> Vec<String> {
    vec![
        "*password*".to_string(),
        "*credit-card*".to_string(),
        "*cvv*".to_string(),
    ]
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("session-replay")
            .join("config.toml")
    }

    /// Save configuration to the default path
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to_path(Self::default_config_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
