// Request admission: everything a /generate call must pass before the
// extractor or the model is touched. Limiter and cache are process-wide
// stores constructed in main and injected through AppState.

pub mod cache;
pub mod clock;
pub mod identifier;
pub mod rate_limit;
pub mod validation;

pub use cache::ExtractionCache;
pub use rate_limit::{RateLimitDecision, RateLimiter, Tier};
