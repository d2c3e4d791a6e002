//! Text Extractor: turns an uploaded resume (PDF or plain text) into normalized text.
//!
//! PDFs are read page by page with `lopdf`. A page that yields no text
//! contributes nothing rather than failing the document, so partially
//! scanned resumes still produce best-effort output. When no page yields
//! anything, `pdf-extract` gets one whole-document pass.
//!
//! Parsing is CPU-bound, so the pipeline calls [`extract_blocking`], which runs
//! [`extract`] inside `tokio::task::spawn_blocking`.

use std::panic::{self, AssertUnwindSafe};

use bytes::Bytes;
use lopdf::Document;
use thiserror::Error;
use tracing::{debug, warn};

pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_MIME: &str = "text/plain";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported document type '{0}' (expected application/pdf or text/plain)")]
    UnsupportedType(String),

    #[error("malformed PDF: {0}")]
    MalformedPdf(String),

    #[error("encrypted PDFs are not supported")]
    EncryptedPdf,

    #[error("document is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Resolves a declared MIME type, ignoring parameters such as `charset`.
    pub fn from_mime(declared: &str) -> Result<Self, ExtractionError> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            PDF_MIME => Ok(DocumentKind::Pdf),
            TEXT_MIME => Ok(DocumentKind::PlainText),
            _ => Err(ExtractionError::UnsupportedType(declared.to_string())),
        }
    }

    /// Guesses from a file name when the upload declared no type.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            DocumentKind::Pdf => PDF_MIME,
            DocumentKind::PlainText => TEXT_MIME,
        }
    }
}

/// Runs [`extract`] on the blocking pool. A panic inside the PDF libraries
/// surfaces as [`ExtractionError::MalformedPdf`].
pub async fn extract_blocking(
    bytes: Bytes,
    declared_mime: String,
) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract(&bytes, &declared_mime))
        .await
        .map_err(|e| {
            warn!("Extraction task aborted: {e}");
            ExtractionError::MalformedPdf("document could not be parsed".to_string())
        })?
}

pub fn extract(bytes: &[u8], declared_mime: &str) -> Result<String, ExtractionError> {
    let text = match DocumentKind::from_mime(declared_mime)? {
        DocumentKind::Pdf => extract_pdf(bytes)?,
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec())?,
    };
    Ok(normalize(&text))
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::MalformedPdf(e.to_string()))?;

    if doc.is_encrypted() {
        return Err(ExtractionError::EncryptedPdf);
    }

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut text = String::new();

    for page in &pages {
        match doc.extract_text(&[*page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => debug!("No text extracted from page {page}: {e}"),
        }
    }

    if text.trim().is_empty() && !pages.is_empty() {
        text = fallback_extract(bytes)?;
    }

    debug!("Extracted {} chars from {} PDF pages", text.len(), pages.len());
    Ok(text)
}

/// Whole-document pass with `pdf-extract`, which panics on some malformed
/// font dictionaries instead of returning an error.
fn fallback_extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => {
            warn!("Whole-document PDF fallback failed: {e}");
            Err(ExtractionError::MalformedPdf(e.to_string()))
        }
        Err(_) => {
            warn!("Whole-document PDF fallback panicked");
            Err(ExtractionError::MalformedPdf(
                "no readable text in document".to_string(),
            ))
        }
    }
}

/// Unifies line endings, drops NULs and trims.
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\0', "")
        .trim()
        .to_string()
}
