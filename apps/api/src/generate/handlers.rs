use axum::{
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::admission::validation::{validate_content_length, validate_request};
use crate::admission::{identifier, RateLimitDecision, Tier};
use crate::errors::AppError;
use crate::generate::body::read_body;
use crate::generate::service::run_generation;
use crate::state::AppState;

/// POST /generate
///
/// Admission runs in a fixed order: declared size, rate limits, body parse,
/// payload validation, API key. Rejections before the rate-limit check do not
/// consume quota. Every response after admission carries rate-limit headers.
pub async fn handle_generate(State(state): State<AppState>, request: Request) -> Response {
    let client = identifier::resolve(request.headers());
    let request_id = Uuid::new_v4();
    let span = info_span!("generate", %request_id, %client);

    async move {
        let limits = &state.config.limits;
        if let Err(rejection) =
            validate_content_length(request.headers().get(CONTENT_LENGTH), limits.max_payload_bytes)
        {
            let quota = state.limiter.peek(&client, Tier::Minute);
            return with_quota(AppError::from(rejection).into_response(), &quota);
        }

        let quota = match state.limiter.admit(&client) {
            Ok(decision) => decision,
            Err(limited) => {
                warn!(
                    tier = limited.tier.as_str(),
                    retry_after = limited.retry_after_secs,
                    "Rate limit exceeded"
                );
                return with_quota(limited.into_error().into_response(), &limited);
            }
        };

        let response = match process(&state, request).await {
            Ok(body) => Json(body).into_response(),
            Err(e) => e.into_response(),
        };
        with_quota(response, &quota)
    }
    .instrument(span)
    .await
}

async fn process(state: &AppState, request: Request) -> Result<Value, AppError> {
    let body = read_body(request).await?;
    let request = validate_request(&body, &state.config.limits)?;
    let model = state.model.as_deref().ok_or(AppError::MissingApiKey)?;

    info!(action = request.action().as_str(), "Request admitted");
    run_generation(request, &state.cache, state.extractor.as_ref(), model).await
}

fn with_quota(mut response: Response, decision: &RateLimitDecision) -> Response {
    decision.apply_headers(response.headers_mut());
    response
}
