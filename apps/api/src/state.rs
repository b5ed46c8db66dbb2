use std::sync::Arc;

use crate::admission::{ExtractionCache, RateLimiter};
use crate::config::Config;
use crate::extraction::Extractor;
use crate::llm_client::ModelClient;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// The limiter and cache are constructed once in `main` and live for the whole
/// process; every clone of the state points at the same stores.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub limiter: Arc<RateLimiter>,
    pub cache: Arc<ExtractionCache>,
    pub extractor: Arc<dyn Extractor>,
    /// `None` when no API key is configured; requests then fail with MISSING_API_KEY.
    pub model: Option<Arc<dyn ModelClient>>,
}
