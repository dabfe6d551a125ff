//! Configuration loading, validation, and management for PipeClaw.
//!
//! Loads configuration from `~/.pipeclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Responder kinds understood by the provider factory.
pub const RESPONDER_KINDS: &[&str] = &["simulated", "openai_compat"];

/// The root configuration structure.
///
/// Maps directly to `~/.pipeclaw/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which model responder drives the loop
    #[serde(default)]
    pub responder: ResponderConfig,

    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentSettings,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// `simulated` (local, no network) or `openai_compat`
    #[serde(default = "default_responder_kind")]
    pub kind: String,

    /// Model name sent to the endpoint
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API (`.../v1`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key for the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Simulated thinking time of the local responder
    #[serde(default = "default_responder_latency_ms")]
    pub latency_ms: u64,

    /// Optional system prompt prepended to every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// HTTP timeout for a single completion request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_responder_kind() -> String {
    "simulated".into()
}
fn default_model() -> String {
    "openai/gpt-4".into()
}
fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_responder_latency_ms() -> u64 {
    1500
}
fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            kind: default_responder_kind(),
            model: default_model(),
            api_url: default_api_url(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            latency_ms: default_responder_latency_ms(),
            system_prompt: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ResponderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("latency_ms", &self.latency_ms)
            .field("system_prompt", &self.system_prompt)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum model queries per turn; 0 disables the guard
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Per-query model timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_timeout_secs: Option<u64>,

    /// Per-call tool timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_timeout_secs: Option<u64>,

    /// Run the tool calls of one step concurrently
    #[serde(default)]
    pub parallel_tool_calls: bool,
}

fn default_max_iterations() -> u32 {
    25
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            model_timeout_secs: None,
            tool_timeout_secs: None,
            parallel_tool_calls: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub aipipe: AiPipeConfig,

    #[serde(default)]
    pub execute_js: ExecuteJsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_latency_ms")]
    pub latency_ms: u64,

    #[serde(default = "default_num_results")]
    pub num_results: usize,
}

fn default_search_latency_ms() -> u64 {
    800
}
fn default_num_results() -> usize {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_search_latency_ms(),
            num_results: default_num_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiPipeConfig {
    #[serde(default = "default_aipipe_latency_ms")]
    pub latency_ms: u64,

    /// Workflow used by the simulated responder when it routes to aipipe
    #[serde(default = "default_workflow")]
    pub default_workflow: String,
}

fn default_aipipe_latency_ms() -> u64 {
    1000
}
fn default_workflow() -> String {
    "general_analysis".into()
}

impl Default for AiPipeConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_aipipe_latency_ms(),
            default_workflow: default_workflow(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteJsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JavaScript runtime binary, resolved through `PATH`
    #[serde(default = "default_js_runtime")]
    pub runtime: String,

    #[serde(default = "default_js_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on captured stdout
    #[serde(default = "default_js_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_js_runtime() -> String {
    "node".into()
}
fn default_js_timeout_secs() -> u64 {
    5
}
fn default_js_max_output_bytes() -> usize {
    64 * 1024
}

impl Default for ExecuteJsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            runtime: default_js_runtime(),
            timeout_secs: default_js_timeout_secs(),
            max_output_bytes: default_js_max_output_bytes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.pipeclaw/config.toml).
    ///
    /// Environment overrides:
    /// - `PIPECLAW_API_KEY`, then `OPENROUTER_API_KEY`, then `OPENAI_API_KEY` (only if no key is configured)
    /// - `PIPECLAW_RESPONDER`
    /// - `PIPECLAW_MODEL`
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

    /// Apply environment overrides using the given variable lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.responder.api_key.is_none() {
            self.responder.api_key = lookup("PIPECLAW_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(kind) = lookup("PIPECLAW_RESPONDER") {
            self.responder.kind = kind;
        }

        if let Some(model) = lookup("PIPECLAW_MODEL") {
            self.responder.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pipeclaw")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !RESPONDER_KINDS.contains(&self.responder.kind.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "responder.kind must be one of {:?}, got '{}'",
                RESPONDER_KINDS, self.responder.kind
            )));
        }

        if !(0.0..=2.0).contains(&self.responder.temperature) {
            return Err(ConfigError::ValidationError(
                "responder.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.tools.execute_js.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tools.execute_js.timeout_secs must be > 0".into(),
            ));
        }

        if self.tools.execute_js.max_output_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "tools.execute_js.max_output_bytes must be > 0".into(),
            ));
        }

        if !is_workflow_name(&self.tools.aipipe.default_workflow) {
            return Err(ConfigError::ValidationError(format!(
                "tools.aipipe.default_workflow '{}' must match [A-Za-z0-9_-]+",
                self.tools.aipipe.default_workflow
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.responder.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Whether `name` is a valid workflow identifier (`[A-Za-z0-9_-]+`).
pub fn is_workflow_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
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
