use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::extraction::ExtractError;
use crate::llm_client::LlmError;

/// The closed set of machine-readable error codes returned to clients.
///
/// Version 2: the original fourteen codes plus the validator's fine-grained
/// codes and `INSUFFICIENT_TEXT`. New variants require a version bump on the
/// client side; do not add codes for one-off failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Rate limiting
    RateLimitExceeded,
    DailyLimitExceeded,
    ApiQuotaExceeded,

    // Validation
    MissingBody,
    MissingAction,
    InvalidAction,
    MissingPayload,
    MissingFile,
    InvalidFileData,
    MissingMimeType,
    InvalidFileType,
    FileTooLarge,
    PayloadTooLarge,
    InvalidContentLength,
    InvalidJdType,
    JdTooLong,
    MissingOptions,
    InvalidLevel,
    InvalidAlignment,
    MissingMessages,
    EmptyMessages,
    TooManyMessages,
    InvalidMessage,
    InvalidRole,
    InvalidText,
    MessageTooLong,

    // Content
    InsufficientText,

    // Server
    MissingApiKey,
    ApiError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::DailyLimitExceeded => "DAILY_LIMIT_EXCEEDED",
            ErrorCode::ApiQuotaExceeded => "API_QUOTA_EXCEEDED",
            ErrorCode::MissingBody => "MISSING_BODY",
            ErrorCode::MissingAction => "MISSING_ACTION",
            ErrorCode::InvalidAction => "INVALID_ACTION",
            ErrorCode::MissingPayload => "MISSING_PAYLOAD",
            ErrorCode::MissingFile => "MISSING_FILE",
            ErrorCode::InvalidFileData => "INVALID_FILE_DATA",
            ErrorCode::MissingMimeType => "MISSING_MIME_TYPE",
            ErrorCode::InvalidFileType => "INVALID_FILE_TYPE",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCode::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            ErrorCode::InvalidJdType => "INVALID_JD_TYPE",
            ErrorCode::JdTooLong => "JD_TOO_LONG",
            ErrorCode::MissingOptions => "MISSING_OPTIONS",
            ErrorCode::InvalidLevel => "INVALID_LEVEL",
            ErrorCode::InvalidAlignment => "INVALID_ALIGNMENT",
            ErrorCode::MissingMessages => "MISSING_MESSAGES",
            ErrorCode::EmptyMessages => "EMPTY_MESSAGES",
            ErrorCode::TooManyMessages => "TOO_MANY_MESSAGES",
            ErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ErrorCode::InvalidRole => "INVALID_ROLE",
            ErrorCode::InvalidText => "INVALID_TEXT",
            ErrorCode::MessageTooLong => "MESSAGE_TOO_LONG",
            ErrorCode::InsufficientText => "INSUFFICIENT_TEXT",
            ErrorCode::MissingApiKey => "MISSING_API_KEY",
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// User-facing message shown when no more specific message is available.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::RateLimitExceeded => {
                "Too many requests. Please wait a moment before trying again."
            }
            ErrorCode::DailyLimitExceeded => "Daily usage limit reached. Please try again tomorrow.",
            ErrorCode::ApiQuotaExceeded => {
                "Our AI service has reached its daily capacity. Please try again later."
            }
            ErrorCode::MissingBody | ErrorCode::MissingAction | ErrorCode::MissingPayload => {
                "Invalid request format."
            }
            ErrorCode::InvalidAction => "Invalid request type.",
            ErrorCode::MissingFile => "Please upload a resume file.",
            ErrorCode::InvalidFileData => "The uploaded file appears to be corrupted.",
            ErrorCode::MissingMimeType => "Could not determine file type.",
            ErrorCode::InvalidFileType => "Only PDF and Word documents are supported.",
            ErrorCode::FileTooLarge => "File is too large. Maximum size is 10MB.",
            ErrorCode::PayloadTooLarge => "Request is too large. Please try with a smaller file.",
            ErrorCode::InvalidContentLength => "Invalid content length.",
            ErrorCode::InvalidJdType => "Job description must be text.",
            ErrorCode::JdTooLong => "Job description is too long.",
            ErrorCode::MissingOptions => "Refactor options are required.",
            ErrorCode::InvalidLevel => "Invalid career level.",
            ErrorCode::InvalidAlignment => "JD alignment must be between 0 and 100.",
            ErrorCode::MissingMessages | ErrorCode::EmptyMessages => {
                "At least one message is required."
            }
            ErrorCode::TooManyMessages => "Too many messages in conversation.",
            ErrorCode::InvalidMessage | ErrorCode::InvalidRole | ErrorCode::InvalidText => {
                "One of the chat messages is malformed."
            }
            ErrorCode::MessageTooLong => "A chat message exceeds the maximum length.",
            ErrorCode::InsufficientText => {
                "File contains insufficient text (likely a scanned image). Please use a text-based PDF/DOCX."
            }
            ErrorCode::MissingApiKey => {
                "Service is temporarily unavailable. Please try again later."
            }
            ErrorCode::ApiError => {
                "An error occurred while processing your request. Please try again."
            }
            ErrorCode::InternalError => "Something went wrong. Please try again later.",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::RateLimitExceeded
            | ErrorCode::DailyLimitExceeded
            | ErrorCode::ApiQuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InsufficientText => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::MissingApiKey | ErrorCode::ApiError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire body for every failed request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub error_code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: Option<String>) -> Self {
        Self {
            error: message.unwrap_or_else(|| code.default_message().to_string()),
            error_code: code,
            retry_after: None,
            details: None,
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        // A zero delay is never surfaced.
        self.retry_after = (seconds > 0).then_some(seconds);
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.error_code.status(), Json(self)).into_response()
    }
}

/// A validator rejection: the first rule the request violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct Rejection {
    pub code: ErrorCode,
    pub message: String,
}

impl Rejection {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Request rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Rate limited ({code}), retry after {retry_after}s")]
    RateLimited {
        code: ErrorCode,
        tier: &'static str,
        retry_after: u64,
    },

    #[error("Model API key is not configured")]
    MissingApiKey,

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps any failure onto the wire body. Local failures keep their exact
    /// code; upstream model failures go through [`classify_upstream`].
    pub fn to_api_error(&self) -> ApiError {
        match self {
            AppError::Rejected(rejection) => {
                tracing::debug!("Rejected request: {rejection}");
                ApiError::new(rejection.code, Some(rejection.message.clone()))
            }
            AppError::RateLimited {
                code,
                tier,
                retry_after,
            } => ApiError::new(*code, None)
                .with_retry_after(*retry_after)
                .with_detail("tier", *tier),
            AppError::MissingApiKey => {
                tracing::error!("GEMINI_API_KEY is not configured");
                ApiError::new(ErrorCode::MissingApiKey, None)
            }
            AppError::Extraction(e) => {
                let code = e.code();
                if code == ErrorCode::InternalError {
                    tracing::error!("Text extraction error: {e}");
                } else {
                    tracing::warn!("Text extraction rejected document: {e}");
                }
                ApiError::new(code, None)
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                let classified = classify_upstream(e);
                ApiError::new(classified.code, Some(classified.message.to_string()))
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                ApiError::new(ErrorCode::InternalError, None)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}

/// Outcome of classifying an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub code: ErrorCode,
    pub message: &'static str,
}

impl From<ErrorCode> for Classified {
    fn from(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message(),
        }
    }
}

/// Classifies a model-provider failure. A structured provider status wins
/// when present; otherwise only text that came from the provider or the
/// transport is matched heuristically. A reply that arrived but cannot be
/// used is always `API_ERROR`.
pub fn classify_upstream(err: &LlmError) -> Classified {
    if let Some(code) = err.structured_code() {
        return code.into();
    }
    match err {
        LlmError::Api {
            status, message, ..
        } => classify_message(&format!("{status} {message}")),
        LlmError::Http(e) => classify_message(&e.to_string()),
        LlmError::Parse(_) | LlmError::EmptyContent => ErrorCode::ApiError.into(),
    }
}

/// Maps free-text upstream error messages onto the taxonomy. Never fails:
/// anything unrecognized becomes `API_ERROR`.
pub fn classify_message(message: &str) -> Classified {
    let message = message.to_lowercase();

    let code = if ["429", "rate limit", "too many requests"]
        .iter()
        .any(|needle| message.contains(needle))
    {
        ErrorCode::RateLimitExceeded
    } else if [
        "quota",
        "exceeded",
        "billing",
        "resource exhausted",
        "resource_exhausted",
    ]
    .iter()
    .any(|needle| message.contains(needle))
    {
        ErrorCode::ApiQuotaExceeded
    } else {
        ErrorCode::ApiError
    };

    code.into()
}
