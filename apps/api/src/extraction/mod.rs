//! Document → plain-text extraction.
//!
//! The admission pipeline only sees the [`Extractor`] trait; [`DocumentExtractor`]
//! is the production implementation for PDF and DOCX uploads.

pub mod docx;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::errors::ErrorCode;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Upload MIME types accepted by the validator.
pub const ALLOWED_MIME_TYPES: &[&str] = &[MIME_PDF, MIME_DOCX];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("DOCX parse error: {0}")]
    Docx(String),

    #[error("Document contains insufficient text ({chars} characters, need {min})")]
    InsufficientText { chars: usize, min: usize },

    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ExtractError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExtractError::UnsupportedType(_) => ErrorCode::InvalidFileType,
            ExtractError::Pdf(_) | ExtractError::Docx(_) => ErrorCode::InvalidFileData,
            ExtractError::InsufficientText { .. } => ErrorCode::InsufficientText,
            ExtractError::Task(_) => ErrorCode::InternalError,
        }
    }
}

/// Turns a binary document into raw (un-normalized) text.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, bytes: Bytes, mime_type: &str) -> Result<String, ExtractError>;
}

/// PDF via `pdf-extract`, DOCX via the `word/document.xml` part.
/// Parsing is CPU-bound and runs inside `spawn_blocking`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentExtractor;

#[async_trait]
impl Extractor for DocumentExtractor {
    async fn extract(&self, bytes: Bytes, mime_type: &str) -> Result<String, ExtractError> {
        let kind = DocumentKind::from_mime(mime_type)
            .ok_or_else(|| ExtractError::UnsupportedType(mime_type.to_string()))?;

        let text = tokio::task::spawn_blocking(move || match kind {
            DocumentKind::Pdf => pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ExtractError::Pdf(e.to_string())),
            DocumentKind::Docx => docx::extract_text(&bytes),
        })
        .await??;

        debug!("Extracted {} characters from {:?} document", text.len(), kind);
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Loose match on the declared label; the validator already enforces the allow-list.
    fn from_mime(mime_type: &str) -> Option<Self> {
        let mime = mime_type.to_ascii_lowercase();
        if mime.contains("pdf") {
            Some(DocumentKind::Pdf)
        } else if mime.contains("word") || mime.contains("docx") || mime.contains("officedocument")
        {
            Some(DocumentKind::Docx)
        } else {
            None
        }
    }
}

/// Collapses every run of whitespace to a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(
            normalize_whitespace("  Senior\n\n Engineer\t\tat   Acme \r\n"),
            "Senior Engineer at Acme"
        );
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_document_kind_from_mime() {
        assert_eq!(DocumentKind::from_mime(MIME_PDF), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_mime(MIME_DOCX), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_mime("image/png"), None);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected_before_parsing() {
        let err = DocumentExtractor
            .extract(Bytes::from_static(b"\x89PNG"), "image/png")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFileType);
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_invalid_file_data() {
        let err = DocumentExtractor
            .extract(Bytes::from_static(b"definitely not a pdf"), MIME_PDF)
            .await
            .unwrap_err();
        // pdf-extract may panic on hostile input; either path must not be a success.
        assert!(matches!(
            err.code(),
            ErrorCode::InvalidFileData | ErrorCode::InternalError
        ));
    }

    #[test]
    fn test_insufficient_text_code() {
        let err = ExtractError::InsufficientText { chars: 3, min: 50 };
        assert_eq!(err.code(), ErrorCode::InsufficientText);
    }
}
