mod admission;
mod config;
mod errors;
mod extraction;
mod generate;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::admission::{ExtractionCache, RateLimiter};
use crate::config::Config;
use crate::extraction::DocumentExtractor;
use crate::llm_client::{GeminiClient, ModelClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    info!(
        per_minute = config.rate_limit.per_minute,
        per_day = config.rate_limit.per_day,
        "Rate limiter initialized"
    );

    let cache = Arc::new(ExtractionCache::new(&config.cache));
    info!(capacity = config.cache.capacity, "Extraction cache initialized");

    let model: Option<Arc<dyn ModelClient>> = match &config.gemini_api_key {
        Some(key) => {
            let client = GeminiClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(client))
        }
        None => {
            warn!("GEMINI_API_KEY is not set; /generate will answer MISSING_API_KEY");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        limiter,
        cache,
        extractor: Arc::new(DocumentExtractor),
        model,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
