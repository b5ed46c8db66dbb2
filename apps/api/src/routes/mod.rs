pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::generate::handlers;
use crate::state::AppState;

const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (
        HeaderName::from_static("permissions-policy"),
        "camera=(), microphone=(), geolocation=()",
    ),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=31536000; includeSubDomains; preload",
    ),
];

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.limits.max_payload_bytes;

    let mut router = Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/generate",
            post(handlers::handle_generate).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state);

    for (name, value) in &SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(
            name.clone(),
            HeaderValue::from_static(*value),
        ));
    }
    router
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::admission::{ExtractionCache, RateLimiter};
    use crate::config::Config;
    use crate::extraction::DocumentExtractor;

    fn state() -> AppState {
        let config = Config::for_tests();
        AppState {
            limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            cache: Arc::new(ExtractionCache::new(&config.cache)),
            extractor: Arc::new(DocumentExtractor),
            model: None,
            config,
        }
    }

    #[tokio::test]
    async fn test_health_carries_security_headers() {
        let response = build_router(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        let expected = [
            ("x-content-type-options", "nosniff"),
            ("x-frame-options", "DENY"),
            ("referrer-policy", "strict-origin-when-cross-origin"),
            ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
            (
                "strict-transport-security",
                "max-age=31536000; includeSubDomains; preload",
            ),
        ];
        for (name, value) in expected {
            assert_eq!(headers.get(name).map(|v| v.to_str().unwrap()), Some(value), "{name}");
        }
    }

    #[tokio::test]
    async fn test_generate_requires_post() {
        let response = build_router(state())
            .oneshot(Request::get("/generate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
