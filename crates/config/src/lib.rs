//! Configuration loading, validation, and management for Valet.
//!
//! Loads configuration from `~/.valet/config.toml` with environment
//! variable overrides. Validates all settings at startup. Every budget and
//! threshold the orchestration loop enforces is overridable here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.valet/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible model endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Orchestration loop budgets and thresholds
    #[serde(default)]
    pub agent: AgentConfig,

    /// History persistence configuration
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Budgets, thresholds, and tunable policies of the orchestration loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Token budget for context assembly
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Wall-clock timeout for one turn, in seconds
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,

    /// Maximum model calls per turn
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Model sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per model call
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Loop detector: how many recent action signatures to keep
    #[serde(default = "default_loop_history_depth")]
    pub loop_history_depth: usize,

    /// Loop detector: how many non-rejected occurrences of the same
    /// signature are tolerated before flagging
    #[serde(default = "default_loop_repeat_threshold")]
    pub loop_repeat_threshold: u32,

    /// Validator: how many recent context messages to scan for a
    /// redundant search
    #[serde(default = "default_redundancy_lookback")]
    pub redundancy_lookback: usize,

    /// Maximum characters of a tool observation fed back into context
    #[serde(default = "default_observation_max_chars")]
    pub observation_max_chars: usize,

    /// How many history messages to fetch from the store per turn
    #[serde(default = "default_history_fetch_limit")]
    pub history_fetch_limit: usize,

    /// How many memory snippets to recall per turn
    #[serde(default = "default_memory_recall_limit")]
    pub memory_recall_limit: usize,

    /// Minimum relevance score for recalled memory snippets
    #[serde(default = "default_memory_min_score")]
    pub memory_min_score: f32,

    /// The announce-without-acting detection policy
    #[serde(default)]
    pub announcement: AnnouncementPolicy,
}

/// Detection policy for model output that announces an action in prose
/// without emitting the tool call. Keyword lists are a product-tuning
/// concern, not a correctness contract, so they live in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementPolicy {
    /// Phrases signalling intent ("i will", "let me", ...)
    #[serde(default = "default_intent_phrases")]
    pub intent_phrases: Vec<String>,

    /// Keywords hinting at a tool ("search", "note", ...)
    #[serde(default = "default_tool_hints")]
    pub tool_hints: Vec<String>,

    /// Only short outputs are treated as announcements
    #[serde(default = "default_announcement_max_chars")]
    pub max_chars: usize,
}

/// History persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Backend: "memory" or "sqlite"
    #[serde(default = "default_history_backend")]
    pub backend: String,

    /// SQLite database path (used when backend = "sqlite")
    #[serde(default = "default_history_path")]
    pub sqlite_path: String,
}

fn default_api_url() -> String {
    "https://api.mistral.ai/v1".into()
}
fn default_model() -> String {
    "mistral-large-latest".into()
}
fn default_token_budget() -> usize {
    30_000
}
fn default_turn_timeout_secs() -> u64 {
    60
}
fn default_max_steps() -> u32 {
    10
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_output_tokens() -> u32 {
    2000
}
fn default_loop_history_depth() -> usize {
    12
}
fn default_loop_repeat_threshold() -> u32 {
    2
}
fn default_redundancy_lookback() -> usize {
    8
}
fn default_observation_max_chars() -> usize {
    12_000
}
fn default_history_fetch_limit() -> usize {
    15
}
fn default_memory_recall_limit() -> usize {
    3
}
fn default_memory_min_score() -> f32 {
    0.45
}
fn default_intent_phrases() -> Vec<String> {
    ["i will", "i'll", "let me", "checking", "searching for"]
        .map(String::from)
        .to_vec()
}
fn default_tool_hints() -> Vec<String> {
    ["search", "note", "scrape", "image", "wallet", "calendar", "command"]
        .map(String::from)
        .to_vec()
}
fn default_announcement_max_chars() -> usize {
    250
}
fn default_history_backend() -> String {
    "memory".into()
}
fn default_history_path() -> String {
    "~/.valet/history.db".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            turn_timeout_secs: default_turn_timeout_secs(),
            max_steps: default_max_steps(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            loop_history_depth: default_loop_history_depth(),
            loop_repeat_threshold: default_loop_repeat_threshold(),
            redundancy_lookback: default_redundancy_lookback(),
            observation_max_chars: default_observation_max_chars(),
            history_fetch_limit: default_history_fetch_limit(),
            memory_recall_limit: default_memory_recall_limit(),
            memory_min_score: default_memory_min_score(),
            announcement: AnnouncementPolicy::default(),
        }
    }
}

impl Default for AnnouncementPolicy {
    fn default() -> Self {
        Self {
            intent_phrases: default_intent_phrases(),
            tool_hints: default_tool_hints(),
            max_chars: default_announcement_max_chars(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_history_backend(),
            sqlite_path: default_history_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            agent: AgentConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("agent", &self.agent)
            .field("history", &self.history)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.valet/config.toml).
    ///
    /// Also checks environment variables:
    /// - `VALET_API_KEY` / `MISTRAL_API_KEY` for the API key
    /// - `VALET_API_URL` for the endpoint
    /// - `VALET_MODEL` for the model identifier
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("VALET_API_KEY")
                .ok()
                .or_else(|| std::env::var("MISTRAL_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("VALET_API_URL") {
            config.api_url = url;
        }

        if let Ok(model) = std::env::var("VALET_MODEL") {
            config.model = model;
        }

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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".valet")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.agent.loop_history_depth == 0 {
            return Err(ConfigError::ValidationError(
                "agent.loop_history_depth must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
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
