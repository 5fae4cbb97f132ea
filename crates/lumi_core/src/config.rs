//! Core runtime configuration.
//!
//! # Responsibility
//! - Hold user-zone and reminder policy knobs consumed by services.
//! - Hold local-model settings (context size, sampling, asset location).
//! - Parse TOML overrides on top of built-in defaults.
//!
//! # Invariants
//! - `utc_offset_minutes` stays within +-18h so it maps to a valid offset.
//! - `fallback_reminder_hour` is a valid hour of day.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Asia/Kolkata, which has no daylight saving.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
pub const DEFAULT_FALLBACK_REMINDER_HOUR: u32 = 21;
pub const DEFAULT_TASK_HISTORY_DAYS: u32 = 30;

const MAX_OFFSET_MINUTES: i32 = 18 * 60;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config toml: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Top-level configuration shared by all services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// User calendar zone as minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// Hour of day (user zone) that expired reminders are moved to.
    pub fallback_reminder_hour: u32,
    pub reminder_channel_id: String,
    pub reminder_channel_name: String,
    /// Default window for the task history query.
    pub task_history_days: u32,
    pub model: ModelConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            fallback_reminder_hour: DEFAULT_FALLBACK_REMINDER_HOUR,
            reminder_channel_id: "reminder".to_string(),
            reminder_channel_name: "Reminder Channel".to_string(),
            task_history_days: DEFAULT_TASK_HISTORY_DAYS,
            model: ModelConfig::default(),
        }
    }
}

/// On-device model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub context_size: u32,
    pub n_predict: u32,
    pub temperature: f32,
    /// Directory holding the GGUF bundle. `None` lets the host decide.
    pub model_dir: Option<PathBuf>,
    pub gguf_url: String,
    pub metadata_url: String,
    pub vocab_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            context_size: 2048,
            n_predict: 200,
            temperature: 0.7,
            model_dir: None,
            gguf_url: "https://huggingface.co/Taru/lumi-mobile/resolve/main/lumi_finetuned.gguf?download=true".to_string(),
            metadata_url: "https://huggingface.co/Taru/lumi-mobile/resolve/main/gguf_metadata.json?download=true".to_string(),
            vocab_url: "https://huggingface.co/Taru/lumi-mobile/resolve/main/vocab.json?download=true".to_string(),
        }
    }
}

impl CoreConfig {
    /// Parses TOML; absent keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.utc_offset_minutes.abs() >= MAX_OFFSET_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes {} is outside +-{MAX_OFFSET_MINUTES}",
                self.utc_offset_minutes
            )));
        }
        if self.fallback_reminder_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "fallback_reminder_hour {} must be within 0..=23",
                self.fallback_reminder_hour
            )));
        }
        if self.reminder_channel_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "reminder_channel_id must not be blank".to_string(),
            ));
        }
        if self.model.context_size == 0 {
            return Err(ConfigError::Invalid(
                "model.context_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// User calendar zone. Falls back to UTC for out-of-range values that
    /// bypassed `validate`.
    pub fn zone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}
