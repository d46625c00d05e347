//! Configuration loading and management for trendwire.
//!
//! Loads settings from `trendwire.toml` with environment variable overrides for
//! deployment-specific values. A missing file falls back to defaults so the
//! service starts with zero configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "trendwire.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid value for environment variable: {0}")]
    InvalidEnv(&'static str),
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Code-search upstream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Base URL of the search API
    pub api_base: String,
    /// Operator token, raises the upstream rate limit when set
    pub token: Option<String>,
    /// Results requested per search query
    pub per_page: u32,
    /// Window for the "recently pushed" query, in days
    pub recency_days: i64,
    /// How long a successful fetch is reused, in seconds
    pub cache_ttl_secs: u64,
}

/// Base URLs for the text-generation providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub groq: String,
    pub openai: String,
    pub anthropic: String,
}

/// Outbound HTTP settings shared by every upstream client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GithubConfig,
    pub providers: ProviderEndpoints,
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from the default location (trendwire.toml in cwd or home)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::read_file(&path)?,
            None => Config::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("TRENDWIRE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("TRENDWIRE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("TRENDWIRE_PORT"))?;
        }
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                self.github.token = Some(token);
            }
        }
        Ok(())
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Some(local_config);
        }

        let home_config = dirs::home_dir()?
            .join(".config")
            .join("trendwire")
            .join(CONFIG_FILE_NAME);
        home_config.exists().then_some(home_config)
    }

    /// Socket address string for the listener
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.github.cache_ttl_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: None,
            per_page: 20,
            recency_days: 7,
            cache_ttl_secs: 300,
        }
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            groq: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            openai: "https://api.openai.com/v1/chat/completions".to_string(),
            anthropic: "https://api.anthropic.com/v1/messages".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}
