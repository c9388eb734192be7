use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::model::SchemaPolicy;
use crate::prompt::PromptVersion;

/// Process-wide configuration, loaded once at startup and passed by reference
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Region of the Bedrock runtime endpoint
    #[serde(default = "default_region")]
    pub region: String,
    /// Model used when a request does not name one
    #[serde(default = "default_model_id")]
    pub default_model_id: String,
    /// Output token limit used when a request does not set one
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    /// Sampling temperature used when a request does not set one
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Read timeout for each backend call in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Override of the runtime endpoint (proxies, tests)
    pub endpoint: Option<String>,
    /// Bearer token (can also be set via AWS_BEARER_TOKEN_BEDROCK)
    pub api_key: Option<String>,
    /// Strictness of the dish schema
    #[serde(default)]
    pub schema_policy: SchemaPolicy,
    /// Prompt version for text requests
    #[serde(default)]
    pub prompt_version: PromptVersion,
    /// Answer with canned responses instead of calling the backend
    #[serde(default)]
    pub mock_mode: bool,
    /// Retry behaviour for transient backend failures
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Exponential backoff settings for the backend invoker
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds, doubled for each later one
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for a single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Randomize each delay by up to 25%
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            default_model_id: default_model_id(),
            default_max_tokens: default_max_tokens(),
            default_temperature: default_temperature(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            endpoint: None,
            api_key: None,
            schema_policy: SchemaPolicy::default(),
            prompt_version: PromptVersion::default(),
            mock_mode: false,
            retry: RetryConfig::default(),
        }
    }
}

// Default value functions
fn default_region() -> String {
    "ap-southeast-1".to_string()
}

fn default_model_id() -> String {
    "anthropic.claude-3-5-sonnet-20240620-v1:0".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f64 {
    0.2
}

fn default_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    800
}

fn default_max_delay_ms() -> u64 {
    8000
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with DISH_EXTRACT__ prefix
    /// 2. dish-extract.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: DISH_EXTRACT__RETRY__MAX_ATTEMPTS
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    /// Runtime endpoint, derived from the region unless overridden
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("dish-extract").required(false))
        // Use double underscore for nested: DISH_EXTRACT__RETRY__MAX_ATTEMPTS
        .add_source(
            Environment::with_prefix("DISH_EXTRACT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
