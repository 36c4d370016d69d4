use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use common::config::{Config, InferenceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use vinomap_c::OllamaEngine;

use crate::inference::{handlers, page::PageRenderer, RequestTracker};
use crate::util::shutdown_signal;

/// Region Gateway - accepts browser requests and relays them to the inference endpoint
pub struct RegionGateway {
    pub engine: OllamaEngine,
    pub tracker: Arc<RequestTracker>,
    pub pages: PageRenderer,
    pub inference: InferenceConfig,
    pub static_dir: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl RegionGateway {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            engine: OllamaEngine::new(&config.inference)?,
            tracker: Arc::new(RequestTracker::new()),
            pages: PageRenderer::new()?,
            inference: config.inference.clone(),
            static_dir: PathBuf::from(&config.server.static_dir),
            started_at: Utc::now(),
        })
    }

    /// Run the gateway until SIGINT/SIGTERM
    pub async fn run(self: Arc<Self>, host: &str, port: u16) -> Result<()> {
        let app = self.create_router();
        let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

        info!("Region gateway listening on {}:{}", host, port);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(Into::into)
    }

    pub fn create_router(self: Arc<Self>) -> Router {
        let static_files = ServeDir::new(&self.static_dir);
        Router::new()
            .route("/", get(handlers::index))
            .route("/get_region_info", post(handlers::get_region_info))
            .route("/health", get(handlers::health))
            .nest_service("/static", static_files)
            .layer(CorsLayer::permissive())
            .with_state(self)
    }
}
