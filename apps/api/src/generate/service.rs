use serde_json::{json, Value};
use tracing::info;

use crate::admission::ExtractionCache;
use crate::errors::AppError;
use crate::extraction::Extractor;
use crate::generate::prompts::{
    build_audit_prompt, build_refactor_prompt, CHAT_GREETING, CHAT_SYSTEM,
};
use crate::generate::sanitize::sanitize_html;
use crate::llm_client::{parse_json, ModelClient};
use crate::models::request::{ChatMessage, ChatRole, FileUpload, GenerateRequest};

/// Runs an admitted, validated request against the model.
///
/// - audit: the model's JSON report, passed through
/// - refactor: `{ "text": <sanitized html> }`
/// - chat: `{ "text": <reply> }`
pub async fn run_generation(
    request: GenerateRequest,
    cache: &ExtractionCache,
    extractor: &dyn Extractor,
    model: &dyn ModelClient,
) -> Result<Value, AppError> {
    match request {
        GenerateRequest::Audit { file, jd_text } => {
            let resume_text = resume_text(&file, cache, extractor).await?;
            let prompt = build_audit_prompt(&resume_text, jd_text.as_deref());
            let reply = model.generate(&[user(prompt)]).await?;
            let report: Value = parse_json(&reply)?;
            Ok(report)
        }
        GenerateRequest::Refactor {
            file,
            jd_text,
            options,
        } => {
            let resume_text = resume_text(&file, cache, extractor).await?;
            let prompt = build_refactor_prompt(&resume_text, jd_text.as_deref(), &options);
            let reply = model.generate(&[user(prompt)]).await?;
            Ok(json!({ "text": sanitize_html(&reply) }))
        }
        GenerateRequest::Chat { messages } => {
            let mut contents = Vec::with_capacity(messages.len() + 2);
            contents.push(user(CHAT_SYSTEM.to_string()));
            contents.push(ChatMessage {
                role: ChatRole::Model,
                text: CHAT_GREETING.to_string(),
            });
            contents.extend(messages);
            let reply = model.generate(&contents).await?;
            Ok(json!({ "text": reply }))
        }
    }
}

async fn resume_text(
    file: &FileUpload,
    cache: &ExtractionCache,
    extractor: &dyn Extractor,
) -> Result<String, AppError> {
    let text = cache
        .get_or_extract(&file.bytes, &file.mime_type, extractor)
        .await?;
    info!(
        file = file.name.as_deref().unwrap_or("<unnamed>"),
        chars = text.chars().count(),
        "Resume text ready"
    );
    Ok(text)
}

fn user(text: String) -> ChatMessage {
    ChatMessage {
        role: ChatRole::User,
        text,
    }
}
