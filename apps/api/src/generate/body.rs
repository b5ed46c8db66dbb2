//! Reads a `/generate` body into the JSON shape the validator expects.
//!
//! JSON bodies are parsed as-is. Multipart uploads are folded into the same
//! `{ action, payload }` shape (binary file re-encoded as base64) so both
//! encodings go through identical validation rules.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde_json::{json, Map, Number, Value};

use crate::errors::{ErrorCode, Rejection};

fn too_large() -> Rejection {
    Rejection::new(ErrorCode::PayloadTooLarge, "Request payload too large")
}

/// Buffers and parses the request body. Size is bounded by the router's
/// `DefaultBodyLimit`, which covers bodies sent without `Content-Length`.
pub async fn read_body(request: Request) -> Result<Value, Rejection> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| Rejection::new(ErrorCode::InvalidAction, "Invalid multipart body"))?;
        return multipart_to_json(multipart).await;
    }

    let bytes = Bytes::from_request(request, &()).await.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large()
        } else {
            Rejection::new(ErrorCode::InvalidAction, "Could not read request body")
        }
    })?;

    serde_json::from_slice(&bytes)
        .map_err(|_| Rejection::new(ErrorCode::InvalidAction, "Invalid JSON in request body"))
}

async fn multipart_to_json(mut multipart: Multipart) -> Result<Value, Rejection> {
    let mut action = None;
    let mut payload = Map::new();
    let mut options = Map::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let mime_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                payload.insert(
                    "file".to_string(),
                    json!({
                        "name": file_name,
                        "mimeType": mime_type,
                        "data": STANDARD.encode(&data),
                    }),
                );
            }
            "action" => action = Some(field.text().await.map_err(multipart_error)?),
            "jdText" => {
                let text = field.text().await.map_err(multipart_error)?;
                payload.insert("jdText".to_string(), Value::String(text));
            }
            "level" => {
                let text = field.text().await.map_err(multipart_error)?;
                options.insert("level".to_string(), Value::String(text));
            }
            "jdAlignment" => {
                let text = field.text().await.map_err(multipart_error)?;
                options.insert("jdAlignment".to_string(), numeric_or_string(text));
            }
            "messages" => {
                let text = field.text().await.map_err(multipart_error)?;
                let messages = serde_json::from_str(&text).unwrap_or(Value::String(text));
                payload.insert("messages".to_string(), messages);
            }
            _ => {}
        }
    }

    if !options.is_empty() {
        payload.insert("options".to_string(), Value::Object(options));
    }

    let mut body = Map::new();
    if let Some(action) = action {
        body.insert("action".to_string(), Value::String(action));
    }
    body.insert("payload".to_string(), Value::Object(payload));
    Ok(Value::Object(body))
}

/// Form fields arrive as text; keep the number type so range checks apply.
fn numeric_or_string(text: String) -> Value {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> Rejection {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        Rejection::new(ErrorCode::InvalidFileData, "Malformed multipart body")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn multipart_request(parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Request {
        let boundary = "XBOUNDARYX";
        let mut body = Vec::new();
        for (name, file, content) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match file {
                Some((file_name, mime)) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Request::builder()
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_body_parsed() {
        let value = read_body(json_request(r#"{"action":"chat","payload":{}}"#))
            .await
            .unwrap();
        assert_eq!(value["action"], "chat");
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let rejection = read_body(json_request("{not json")).await.unwrap_err();
        assert_eq!(rejection.code, ErrorCode::InvalidAction);
        assert_eq!(rejection.message, "Invalid JSON in request body");
    }

    #[tokio::test]
    async fn test_multipart_refactor_folded_into_json_shape() {
        let request = multipart_request(&[
            ("action", None, b"refactor"),
            ("file", Some(("cv.pdf", "application/pdf")), b"%PDF-bytes"),
            ("jdText", None, b"Backend role"),
            ("level", None, b"staff"),
            ("jdAlignment", None, b"80"),
        ]);
        let value = read_body(request).await.unwrap();
        assert_eq!(value["action"], "refactor");
        let payload = &value["payload"];
        assert_eq!(payload["file"]["name"], "cv.pdf");
        assert_eq!(payload["file"]["mimeType"], "application/pdf");
        assert_eq!(payload["file"]["data"], STANDARD.encode(b"%PDF-bytes"));
        assert_eq!(payload["jdText"], "Backend role");
        assert_eq!(payload["options"]["level"], "staff");
        assert_eq!(payload["options"]["jdAlignment"].as_f64(), Some(80.0));
    }

    #[tokio::test]
    async fn test_multipart_chat_messages_parsed() {
        let request = multipart_request(&[
            ("action", None, b"chat"),
            ("messages", None, br#"[{"role":"user","text":"hi"}]"#),
        ]);
        let value = read_body(request).await.unwrap();
        assert_eq!(value["payload"]["messages"][0]["text"], "hi");
    }

    #[test]
    fn test_numeric_or_string() {
        assert_eq!(numeric_or_string("42".into()).as_f64(), Some(42.0));
        assert_eq!(numeric_or_string("lots".into()), Value::String("lots".into()));
    }
}
