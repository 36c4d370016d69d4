use anyhow::Result;
use clap::Parser;
use vinomap_c::util::{cmd::Args, init_logging};
use vinomap_c::OllamaEngine;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = args.inference_config();
    let engine = OllamaEngine::new(&config)?;
    let text = engine
        .generate(
            &config.model,
            &args.prompt,
            !args.no_stream,
            config.region_timeout(),
        )
        .await?;

    println!("{}", text);
    Ok(())
}
