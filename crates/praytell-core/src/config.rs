//! Configuration management for PrayTell
//!
//! Loads configuration with priority:
//! 1. The file given explicitly, or named by `CONFIG_FILE`
//! 2. config.toml in the current directory or one of its parents
//! 3. Environment variables (`WEAVIATE_HOST`, `OPENAI_API_KEY`)
//! 4. Defaults

use crate::record::CategoryConfig;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// PrayTell configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on handling a single request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Context store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store provider (weaviate, in-memory)
    #[serde(default = "default_store_provider")]
    pub provider: String,

    /// Store endpoint as scheme://host[:port] (can reference env var with ${VAR_NAME})
    pub url: Option<String>,

    pub api_key: Option<String>,

    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,

    /// Category persisted turns are written to and chat context is read from
    #[serde(default = "CategoryConfig::chat_turns")]
    pub chat_category: CategoryConfig,

    /// Category searched by the similar-messages query
    #[serde(default = "CategoryConfig::messages")]
    pub similar_category: CategoryConfig,
}

/// Completion model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model provider (openai)
    #[serde(default = "default_model_provider")]
    pub provider: String,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// API key (can reference env var with ${VAR_NAME})
    pub api_key: Option<String>,

    /// Base URL for OpenAI-compatible endpoints
    pub base_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

/// Chat cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of context records retrieved per chat turn
    #[serde(default = "default_limit")]
    pub context_limit: usize,

    /// Number of bodies returned by the similar-messages query
    #[serde(default = "default_limit")]
    pub similar_limit: usize,

    /// Delay between submit and dispatch, zero to dispatch immediately
    #[serde(default)]
    pub dispatch_delay_ms: u64,

    /// Location attached to turns of the local conversation
    #[serde(default = "default_location")]
    pub location: String,
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub service_name: Option<String>,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,

    /// Filter directive used when RUST_LOG is unset
    pub log_filter: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            url: None,
            api_key: None,
            timeout_secs: default_store_timeout_secs(),
            chat_category: CategoryConfig::chat_turns(),
            similar_category: CategoryConfig::messages(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            model_name: default_model_name(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the completion API key with a clear error message
    pub fn api_key(&self) -> Result<String> {
        self.api_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "Completion API key not found. Configure it in config.toml:\n\
                [model]\n\
                api_key = \"${{OPENAI_API_KEY}}\"\n\
                \n\
                Or set environment variable:\n\
                export OPENAI_API_KEY=\"your-key\""
            )
        })
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_limit: default_limit(),
            similar_limit: default_limit(),
            dispatch_delay_ms: 0,
            location: default_location(),
        }
    }
}

impl ChatConfig {
    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration with the following priority:
    /// 1. File named by CONFIG_FILE
    /// 2. config.toml in current directory or a parent
    /// 3. Environment variables and defaults
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var("CONFIG_FILE") {
            return Self::load_from(Path::new(&path));
        }

        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config.toml found, using environment and defaults");
                Self::from_env()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse configuration from TOML text and resolve env references
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(contents)?;
        config.resolve_env_vars();
        Ok(config)
    }

    /// Defaults, with endpoint and credential taken from the environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.resolve_env_vars();
        Ok(config)
    }

    /// Find config.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) {
        self.store.url = match self.store.url.take() {
            Some(url) => Self::resolve_env_var(&url),
            None => env::var("WEAVIATE_HOST").ok(),
        };

        if let Some(ref key) = self.store.api_key {
            self.store.api_key = Self::resolve_env_var(key);
        }

        self.model.api_key = match self.model.api_key.take() {
            Some(key) if !key.is_empty() => {
                Self::resolve_env_var(&key).or_else(|| env::var("OPENAI_API_KEY").ok())
            }
            _ => env::var("OPENAI_API_KEY").ok(),
        };

        if let Some(ref url) = self.model.base_url {
            self.model.base_url = Self::resolve_env_var(url);
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Create test-friendly defaults (no network, no API key required)
    pub fn test_defaults() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig {
                provider: "in-memory".to_string(),
                ..StoreConfig::default()
            },
            model: ModelConfig {
                api_key: Some("test-api-key".to_string()),
                ..ModelConfig::default()
            },
            chat: ChatConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_store_provider() -> String {
    "weaviate".to_string()
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_model_provider() -> String {
    "openai".to_string()
}

fn default_model_name() -> String {
    "gpt-4".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_model_timeout_secs() -> u64 {
    30
}

fn default_limit() -> usize {
    3
}

fn default_location() -> String {
    "New York, USA".to_string()
}
