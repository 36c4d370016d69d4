use clap::Parser;
use common::config::{InferenceConfig, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Send one prompt to the inference endpoint", long_about = None)]
pub struct Args {
    /// Prompt to send.
    #[arg(short, long)]
    pub prompt: String,

    /// Full URL of the generate endpoint.
    #[arg(short, long, default_value = DEFAULT_OLLAMA_URL, env = "OLLAMA_URL")]
    pub url: String,

    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Ask for a single JSON object instead of a line-delimited stream.
    #[arg(long)]
    pub no_stream: bool,

    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl Args {
    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            url: self.url.clone(),
            model: self.model.clone(),
            region_timeout_secs: self.timeout_secs,
            ..Default::default()
        }
    }
}
