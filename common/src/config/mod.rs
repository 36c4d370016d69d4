use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://ollama:11434/api/generate";
pub const DEFAULT_MODEL: &str = "mario";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: DEFAULT_STATIC_DIR.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Full URL of the generate endpoint.
    pub url: String,
    pub model: String,
    pub region_timeout_secs: u64,
    pub greeting_timeout_secs: u64,
    /// Retries after the first attempt on 500/502/503/504.
    pub max_retries: u32,
    /// First backoff delay, doubled on each further retry.
    pub backoff_base_ms: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            region_timeout_secs: 60,
            greeting_timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 1000,
            pool_max_idle_per_host: 10,
        }
    }
}

impl InferenceConfig {
    pub fn region_timeout(&self) -> Duration {
        Duration::from_secs(self.region_timeout_secs)
    }

    pub fn greeting_timeout(&self) -> Duration {
        Duration::from_secs(self.greeting_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_toml(&config_str)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).with_context(|| "Failed to parse config file")
    }
}
