use anyhow::{Context, Result};
use clap::Parser;
use common::config::{
    Config, InferenceConfig, ServerConfig, DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_PORT, DEFAULT_STATIC_DIR,
};
use tracing::info;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "vinomap region gateway")]
pub struct Args {
    /// TOML config file. When given, it takes precedence over the flags below.
    #[arg(short('f'), long)]
    pub config: Option<String>,

    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Full URL of the inference generate endpoint.
    #[arg(long, default_value = DEFAULT_OLLAMA_URL, env = "OLLAMA_URL")]
    pub ollama_url: String,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Directory served under /static.
    #[arg(long, default_value = DEFAULT_STATIC_DIR)]
    pub static_dir: String,
}

impl Args {
    pub fn load_config(&self) -> Result<Config> {
        if let Some(config_path) = &self.config {
            let config = Config::from_file(config_path)
                .with_context(|| format!("Failed to load config from {}", config_path))?;
            info!("Loaded config from {}", config_path);
            return Ok(config);
        }

        Ok(Config {
            server: ServerConfig {
                host: self.host.clone(),
                port: self.port,
                static_dir: self.static_dir.clone(),
            },
            inference: InferenceConfig {
                url: self.ollama_url.clone(),
                model: self.model.clone(),
                ..Default::default()
            },
        })
    }
}
