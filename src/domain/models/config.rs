use serde::{Deserialize, Serialize};

/// Main configuration structure for Quorum
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Completion gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Completion gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Base URL of the generateContent API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model id for the fast/cheap tier (decompose, generate, audit, refine)
    #[serde(default = "default_fast_model")]
    pub fast_model: String,

    /// Model id for the capable tier (synthesis)
    #[serde(default = "default_capable_model")]
    pub capable_model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_fast_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_capable_model() -> String {
    "gemini-3-pro-preview".to_string()
}

const fn default_timeout_secs() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            fast_model: default_fast_model(),
            capable_model: default_capable_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Number of perspectives decomposition is asked for
    #[serde(default = "default_perspective_count")]
    pub perspective_count: usize,

    /// Target word count for each branch artifact
    #[serde(default = "default_artifact_word_target")]
    pub artifact_word_target: usize,
}

const fn default_perspective_count() -> usize {
    3
}

const fn default_artifact_word_target() -> usize {
    150
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            perspective_count: default_perspective_count(),
            artifact_word_target: default_artifact_word_target(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
