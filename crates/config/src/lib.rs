//! Configuration loading, validation, and management for Tabmate.
//!
//! Loads configuration from `~/.tabmate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage backends understood by [`MemoryConfig::backend`].
pub const MEMORY_BACKENDS: &[&str] = &["sqlite", "file", "memory", "none"];

/// The root configuration structure.
///
/// Maps directly to `~/.tabmate/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Turn storage configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Context budgeting configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// Streaming renderer configuration
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// One of [`MEMORY_BACKENDS`]
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Storage location; defaults to a file under the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_memory_backend() -> String {
    "sqlite".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
        }
    }
}

impl MemoryConfig {
    /// Resolve the storage path for the configured backend.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => PathBuf::from(p),
            None => {
                let file = if self.backend == "file" {
                    "turns.jsonl"
                } else {
                    "turns.sqlite"
                };
                AppConfig::config_dir().join("memory").join(file)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Total token budget for one assembled request
    #[serde(default = "default_total_tokens")]
    pub total_tokens: usize,

    /// Tokens held back for the new user message
    #[serde(default = "default_new_message_reserve")]
    pub new_message_reserve: usize,

    /// Cap for the long-term history summary
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// How many recent turns are replayed verbatim
    #[serde(default = "default_recent_turns")]
    pub recent_turns: usize,

    /// Marker in a user message that forces the full page back in
    #[serde(default = "default_page_marker")]
    pub page_marker: String,
}

fn default_total_tokens() -> usize {
    3200
}
fn default_new_message_reserve() -> usize {
    200
}
fn default_history_cap() -> usize {
    300
}
fn default_recent_turns() -> usize {
    3
}
fn default_page_marker() -> String {
    "@page".into()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            total_tokens: default_total_tokens(),
            new_message_reserve: default_new_message_reserve(),
            history_cap: default_history_cap(),
            recent_turns: default_recent_turns(),
            page_marker: default_page_marker(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Title given to fenced code blocks without a language line
    #[serde(default = "default_code_title")]
    pub default_code_title: String,

    /// Characters per chunk when the CLI simulates a stream
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_code_title() -> String {
    "Source".into()
}
fn default_chunk_size() -> usize {
    8
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_code_title: default_code_title(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.tabmate/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `TABMATE_MEMORY_BACKEND`
    /// - `TABMATE_CONTEXT_BUDGET`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = lookup("TABMATE_MEMORY_BACKEND") {
            self.memory.backend = backend;
        }

        if let Some(raw) = lookup("TABMATE_CONTEXT_BUDGET") {
            match raw.trim().parse::<usize>() {
                Ok(total) => self.context.total_tokens = total,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring TABMATE_CONTEXT_BUDGET"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".tabmate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be one of {}, got \"{}\"",
                MEMORY_BACKENDS.join(", "),
                self.memory.backend
            )));
        }

        if self.context.new_message_reserve >= self.context.total_tokens {
            return Err(ConfigError::ValidationError(
                "context.new_message_reserve must be smaller than context.total_tokens".into(),
            ));
        }

        if self.context.page_marker.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "context.page_marker must not be empty".into(),
            ));
        }

        if self.render.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "render.chunk_size must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
