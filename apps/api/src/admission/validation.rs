//! Action-addressed request validation.
//!
//! Runs before any expensive work. Every check short-circuits: the first
//! violated rule is returned with its specific code and nothing is processed
//! further. A passing body comes back as a typed [`GenerateRequest`].

use axum::http::HeaderValue;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::config::ValidationLimits;
use crate::errors::{ErrorCode, Rejection};
use crate::extraction::ALLOWED_MIME_TYPES;
use crate::models::request::{
    Action, CareerLevel, ChatMessage, ChatRole, FileUpload, GenerateRequest, RefactorOptions,
};

pub type ValidationResult<T> = Result<T, Rejection>;

/// Cheap pre-parse check of the declared `Content-Length`.
/// A missing header passes; the body read enforces the same ceiling.
pub fn validate_content_length(
    content_length: Option<&HeaderValue>,
    max_payload_bytes: usize,
) -> ValidationResult<()> {
    let Some(raw) = content_length else {
        return Ok(());
    };

    let size = raw
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| Rejection::new(ErrorCode::InvalidContentLength, "Invalid content length"))?;

    if size > max_payload_bytes as u64 {
        return Err(Rejection::new(
            ErrorCode::PayloadTooLarge,
            "Request payload too large",
        ));
    }
    Ok(())
}

/// Validates a parsed `/generate` body and converts it into a typed request.
pub fn validate_request(body: &Value, limits: &ValidationLimits) -> ValidationResult<GenerateRequest> {
    let body = body
        .as_object()
        .ok_or_else(|| Rejection::new(ErrorCode::MissingBody, "Request body is required"))?;

    let action = validate_action(body.get("action"))?;

    let payload = body
        .get("payload")
        .and_then(Value::as_object)
        .ok_or_else(|| Rejection::new(ErrorCode::MissingPayload, "Payload is required"))?;

    match action {
        Action::Audit => {
            let file = validate_file(payload.get("file"), limits)?;
            let jd_text = validate_jd_text(payload.get("jdText"), limits)?;
            Ok(GenerateRequest::Audit { file, jd_text })
        }
        Action::Refactor => {
            let file = validate_file(payload.get("file"), limits)?;
            let jd_text = validate_jd_text(payload.get("jdText"), limits)?;
            let options = validate_refactor_options(payload.get("options"))?;
            Ok(GenerateRequest::Refactor {
                file,
                jd_text,
                options,
            })
        }
        Action::Chat => {
            let messages = validate_messages(payload.get("messages"), limits)?;
            Ok(GenerateRequest::Chat { messages })
        }
    }
}

fn validate_action(action: Option<&Value>) -> ValidationResult<Action> {
    let raw = action
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Rejection::new(ErrorCode::MissingAction, "Action is required"))?;

    Action::parse(raw).ok_or_else(|| Rejection::new(ErrorCode::InvalidAction, "Invalid action type"))
}

fn validate_file(file: Option<&Value>, limits: &ValidationLimits) -> ValidationResult<FileUpload> {
    let file: &Map<String, Value> = file
        .and_then(Value::as_object)
        .ok_or_else(|| Rejection::new(ErrorCode::MissingFile, "File data is required"))?;

    let data = file
        .get("data")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Rejection::new(ErrorCode::InvalidFileData, "Invalid file data format"))?;

    let mime_type = file
        .get("mimeType")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Rejection::new(ErrorCode::MissingMimeType, "File MIME type is required"))?;

    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(Rejection::new(
            ErrorCode::InvalidFileType,
            "Only PDF and DOCX files are allowed",
        ));
    }

    // Base64 inflates by 4/3; estimate the decoded size before decoding anything.
    let estimated_size = data.len() * 3 / 4;
    if estimated_size > limits.max_file_bytes {
        return Err(Rejection::new(
            ErrorCode::FileTooLarge,
            format!(
                "File size exceeds {}MB limit",
                limits.max_file_bytes / (1024 * 1024)
            ),
        ));
    }

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|_| Rejection::new(ErrorCode::InvalidFileData, "File data is not valid base64"))?;

    Ok(FileUpload {
        name: file.get("name").and_then(Value::as_str).map(str::to_string),
        mime_type: mime_type.to_string(),
        bytes: Bytes::from(bytes),
    })
}

/// The job description is optional: absent, null and empty all mean "none".
fn validate_jd_text(
    jd_text: Option<&Value>,
    limits: &ValidationLimits,
) -> ValidationResult<Option<String>> {
    let text = match jd_text {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.is_empty() => return Ok(None),
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(Rejection::new(
                ErrorCode::InvalidJdType,
                "Job description must be a string",
            ))
        }
    };

    if text.chars().count() > limits.max_jd_chars {
        return Err(Rejection::new(
            ErrorCode::JdTooLong,
            "Job description exceeds maximum length",
        ));
    }
    Ok(Some(text.clone()))
}

fn validate_refactor_options(options: Option<&Value>) -> ValidationResult<RefactorOptions> {
    let options = options
        .and_then(Value::as_object)
        .ok_or_else(|| Rejection::new(ErrorCode::MissingOptions, "Refactor options are required"))?;

    let level = options
        .get("level")
        .and_then(Value::as_str)
        .and_then(CareerLevel::parse)
        .ok_or_else(|| Rejection::new(ErrorCode::InvalidLevel, "Invalid career level"))?;

    let jd_alignment = options
        .get("jdAlignment")
        .and_then(Value::as_f64)
        .filter(|a| (0.0..=100.0).contains(a))
        .ok_or_else(|| {
            Rejection::new(
                ErrorCode::InvalidAlignment,
                "JD alignment must be between 0 and 100",
            )
        })?;

    Ok(RefactorOptions {
        level,
        jd_alignment,
    })
}

fn validate_messages(
    messages: Option<&Value>,
    limits: &ValidationLimits,
) -> ValidationResult<Vec<ChatMessage>> {
    let messages = messages
        .and_then(Value::as_array)
        .ok_or_else(|| Rejection::new(ErrorCode::MissingMessages, "Messages array is required"))?;

    if messages.is_empty() {
        return Err(Rejection::new(
            ErrorCode::EmptyMessages,
            "At least one message is required",
        ));
    }
    if messages.len() > limits.max_chat_messages {
        return Err(Rejection::new(
            ErrorCode::TooManyMessages,
            "Too many messages in conversation",
        ));
    }

    messages
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let msg = msg.as_object().ok_or_else(|| {
                Rejection::new(ErrorCode::InvalidMessage, format!("Invalid message at index {i}"))
            })?;

            let role = msg
                .get("role")
                .and_then(Value::as_str)
                .and_then(ChatRole::parse)
                .ok_or_else(|| {
                    Rejection::new(ErrorCode::InvalidRole, format!("Invalid role at message {i}"))
                })?;

            let text = msg
                .get("text")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    Rejection::new(ErrorCode::InvalidText, format!("Invalid text at message {i}"))
                })?;

            if text.chars().count() > limits.max_message_chars {
                return Err(Rejection::new(
                    ErrorCode::MessageTooLong,
                    format!("Message {i} exceeds maximum length"),
                ));
            }

            Ok(ChatMessage {
                role,
                text: text.to_string(),
            })
        })
        .collect()
}
