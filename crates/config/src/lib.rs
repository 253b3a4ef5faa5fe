//! Configuration loading, validation, and management for Assemble.
//!
//! Loads configuration from `~/.assemble/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.assemble/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Retry policy for state execution
    #[serde(default)]
    pub retry: RetryConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
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
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("retry", &self.retry)
            .field("tools", &self.tools)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("context_window", &self.context_window)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name recorded for the agent's final message in the conversation log
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Steps before the step-limit state is forced
    #[serde(default = "default_step_limit")]
    pub step_limit: usize,

    #[serde(default)]
    pub clear_scratch_pad_after_answer: bool,

    #[serde(default)]
    pub clear_data_after_answer: bool,

    /// Maximum evict-and-rebuild rounds per state execution
    #[serde(default = "default_context_handler_limit")]
    pub context_handler_limit: usize,

    /// Tokens kept free below the model's context window
    #[serde(default = "default_token_limit_buffer")]
    pub token_limit_buffer: usize,

    /// Scratch pad eviction: "truncate" or "drop_oldest"
    #[serde(default = "default_eviction")]
    pub eviction: String,

    /// Notes removed per eviction with "drop_oldest"
    #[serde(default = "default_eviction_drop_count")]
    pub eviction_drop_count: usize,

    /// Persona override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

fn default_agent_name() -> String {
    "assemble".into()
}
fn default_step_limit() -> usize {
    10
}
fn default_context_handler_limit() -> usize {
    50
}
fn default_token_limit_buffer() -> usize {
    512
}
fn default_eviction() -> String {
    "truncate".into()
}
fn default_eviction_drop_count() -> usize {
    1
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            step_limit: default_step_limit(),
            clear_scratch_pad_after_answer: false,
            clear_data_after_answer: false,
            context_handler_limit: default_context_handler_limit(),
            token_limit_buffer: default_token_limit_buffer(),
            eviction: default_eviction(),
            eviction_drop_count: default_eviction_drop_count(),
            persona: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
}

fn default_attempts() -> u32 {
    5
}
fn default_initial_delay_secs() -> f64 {
    2.0
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_max_delay_secs() -> f64 {
    30.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_delay_secs: default_initial_delay_secs(),
            multiplier: default_multiplier(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Tools registered for the agent, by name
    #[serde(default = "default_enabled_tools")]
    pub enabled: Vec<String>,

    /// Articles fetched per Wikipedia query
    #[serde(default = "default_wikipedia_top_k")]
    pub wikipedia_top_k: usize,

    /// Characters of article text returned per Wikipedia query
    #[serde(default = "default_wikipedia_max_chars")]
    pub wikipedia_max_chars: usize,
}

fn default_enabled_tools() -> Vec<String> {
    vec!["calculator".into(), "web_search".into()]
}
fn default_wikipedia_top_k() -> usize {
    3
}
fn default_wikipedia_max_chars() -> usize {
    4000
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_tools(),
            wikipedia_top_k: default_wikipedia_top_k(),
            wikipedia_max_chars: default_wikipedia_max_chars(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Context window override, in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<usize>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.assemble/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `ASSEMBLE_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
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

    /// Apply environment overrides through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("ASSEMBLE_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("ASSEMBLE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("ASSEMBLE_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".assemble")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.name.trim().is_empty() {
            return Err(ConfigError::ValidationError("agent.name must not be blank".into()));
        }

        if self.agent.context_handler_limit == 0 {
            return Err(ConfigError::ValidationError(
                "agent.context_handler_limit must be at least 1".into(),
            ));
        }

        if !matches!(self.agent.eviction.as_str(), "truncate" | "drop_oldest") {
            return Err(ConfigError::ValidationError(format!(
                "agent.eviction must be 'truncate' or 'drop_oldest', got '{}'",
                self.agent.eviction
            )));
        }

        if self.retry.attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.attempts must be at least 1".into(),
            ));
        }

        if self.retry.initial_delay_secs < 0.0 || self.retry.max_delay_secs < 0.0 {
            return Err(ConfigError::ValidationError(
                "retry delays must not be negative".into(),
            ));
        }

        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "retry.multiplier must be >= 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            retry: RetryConfig::default(),
            tools: ToolsConfig::default(),
            providers: HashMap::new(),
        }
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
