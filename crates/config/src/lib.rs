//! Configuration loading and validation for Clerk.
//!
//! Loads configuration from `clerk.toml` (working directory by default) with
//! environment variable overrides. Validates all settings at startup.

use clerk_core::{AgentProfile, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "clerk.toml";

/// Longest pause accepted between retry attempts, in seconds.
pub const MAX_RETRY_DELAY_SECS: f64 = 300.0;

/// Longest data-service request timeout accepted, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// The root configuration structure. Maps directly to `clerk.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub transcript: TranscriptConfig,

    #[serde(default)]
    pub data_service: DataServiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
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
            .field("temperature", &self.temperature)
            .field("agent", &self.agent)
            .field("retry", &self.retry)
            .field("gateway", &self.gateway)
            .field("transcript", &self.transcript)
            .field("data_service", &self.data_service)
            .field("logging", &self.logging)
            .finish()
    }
}

/// The active agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Completion rounds allowed per turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

fn default_agent_name() -> String {
    AgentProfile::default().name
}
fn default_instructions() -> String {
    AgentProfile::default().instructions
}
fn default_max_rounds() -> u32 {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            instructions: default_instructions(),
            max_rounds: default_max_rounds(),
        }
    }
}

impl AgentConfig {
    pub fn profile(&self) -> AgentProfile {
        AgentProfile::new(&self.name, &self.instructions)
    }
}

/// Retry policy for the completion service and the transcript file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
}

fn default_attempts() -> u32 {
    3
}
fn default_delay_secs() -> f64 {
    1.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        let delay = Duration::try_from_secs_f64(self.delay_secs.clamp(0.0, MAX_RETRY_DELAY_SECS))
            .unwrap_or_default();
        RetryPolicy::new(self.attempts, delay)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Conversation listed by `GET /api/messages/` when the request names none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_conversation_id: Option<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            history_conversation_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// CSV file holding every message of every conversation
    #[serde(default = "default_transcript_path")]
    pub path: PathBuf,
}

fn default_transcript_path() -> PathBuf {
    PathBuf::from("messages.csv")
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            path: default_transcript_path(),
        }
    }
}

/// The external order/product data service the tools query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataServiceConfig {
    #[serde(default = "default_orders_endpoint")]
    pub orders_endpoint: String,

    #[serde(default = "default_products_endpoint")]
    pub products_endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Rows handed to the model per lookup; whole tables are too large
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_orders_endpoint() -> String {
    "http://localhost:8001/data".into()
}
fn default_products_endpoint() -> String {
    "http://localhost:8001/products".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_results() -> usize {
    3
}

impl Default for DataServiceConfig {
    fn default() -> Self {
        Self {
            orders_endpoint: default_orders_endpoint(),
            products_endpoint: default_products_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Rotated files kept on disk (one per day)
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("log")
}
fn default_file_prefix() -> String {
    "clerk.log".into()
}
fn default_max_files() -> usize {
    10
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: default_file_prefix(),
            max_files: default_max_files(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or `clerk.toml` in the working
    /// directory, then apply environment overrides.
    ///
    /// - `CLERK_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `CLERK_MODEL`
    /// - `ORDERS_ENDPOINT`, `PRODUCTS_ENDPOINT`
    /// - `CLERK_TRANSCRIPT_PATH`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
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

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("CLERK_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = var("CLERK_MODEL") {
            self.model = model;
        }
        if let Some(endpoint) = var("ORDERS_ENDPOINT") {
            self.data_service.orders_endpoint = endpoint;
        }
        if let Some(endpoint) = var("PRODUCTS_ENDPOINT") {
            self.data_service.products_endpoint = endpoint;
        }
        if let Some(path) = var("CLERK_TRANSCRIPT_PATH") {
            self.transcript.path = PathBuf::from(path);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.retry.attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.attempts must be at least 1".into(),
            ));
        }

        if !(0.0..=MAX_RETRY_DELAY_SECS).contains(&self.retry.delay_secs) {
            return Err(ConfigError::ValidationError(format!(
                "retry.delay_secs must be between 0 and {MAX_RETRY_DELAY_SECS}"
            )));
        }

        if !(1..=MAX_TIMEOUT_SECS).contains(&self.data_service.timeout_secs) {
            return Err(ConfigError::ValidationError(format!(
                "data_service.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }

        if self.agent.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_rounds must be at least 1".into(),
            ));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The effective configuration as TOML with the API key redacted.
    pub fn redacted_toml(&self) -> String {
        let mut shown = self.clone();
        if shown.api_key.is_some() {
            shown.api_key = Some("[REDACTED]".into());
        }
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: None,
            agent: AgentConfig::default(),
            retry: RetryConfig::default(),
            gateway: GatewayConfig::default(),
            transcript: TranscriptConfig::default(),
            data_service: DataServiceConfig::default(),
            logging: LoggingConfig::default(),
        }
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
