use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use vinomap_s::inference::RegionGateway;
use vinomap_s::util::{cmd::Args, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = args.load_config()?;

    info!(
        "Using inference endpoint {} with model {}",
        config.inference.url, config.inference.model
    );

    let gateway = Arc::new(RegionGateway::new(&config)?);
    gateway.run(&config.server.host, config.server.port).await?;

    info!("Region gateway stopped");
    Ok(())
}
