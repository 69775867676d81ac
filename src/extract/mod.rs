//! Raw-text extraction for uploaded documents.
//!
//! Each supported content type maps to one decoding strategy: PDFs are read
//! page by page, DOCX archives contribute their paragraph text in one step,
//! and plain text is decoded as UTF-8. Extraction is a pure transformation
//! of bytes to text; the caller owns validation of upload size and routing
//! of the resulting text into the chunking pipeline.

use anyhow::Error as FormatError;
use thiserror::Error;

/// Document formats the extractor can decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Paginated PDF document.
    Pdf,
    /// OOXML word-processing document.
    Docx,
    /// UTF-8 plain text.
    PlainText,
}

impl DocumentFormat {
    /// Resolve a declared content type into a supported format.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "text/plain" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Errors produced while turning uploaded bytes into raw text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Declared content type is outside the supported set.
    #[error("Unsupported content type: {0}")]
    UnsupportedFormat(String),
    /// The format library rejected the document contents.
    #[error("Failed to extract text from '{name}': {source}")]
    ExtractionFailed {
        /// Display name of the offending upload.
        name: String,
        /// Underlying error raised by the format library.
        #[source]
        source: FormatError,
    },
    /// Extraction succeeded but produced no usable text.
    #[error("No text content found in '{0}'")]
    EmptyDocument(String),
}

/// Extract raw text from an uploaded document.
///
/// Dispatches on the declared content type and rejects anything outside the
/// supported set. The `display_name` is used only for error messages.
pub fn extract_text(
    bytes: &[u8],
    content_type: &str,
    display_name: &str,
) -> Result<String, ExtractError> {
    let format = DocumentFormat::from_content_type(content_type)
        .ok_or_else(|| ExtractError::UnsupportedFormat(content_type.to_string()))?;

    let raw_text = match format {
        DocumentFormat::Pdf => extract_pdf_text(bytes),
        DocumentFormat::Docx => extract_docx_text(bytes),
        DocumentFormat::PlainText => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(FormatError::new),
    }
    .map_err(|source| ExtractError::ExtractionFailed {
        name: display_name.to_string(),
        source,
    })?;

    if raw_text.trim().is_empty() {
        return Err(ExtractError::EmptyDocument(display_name.to_string()));
    }

    Ok(raw_text)
}

/// Extract PDF text page by page, in page-number order.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, FormatError> {
    let document = lopdf::Document::load_mem(bytes)?;
    let mut raw_text = String::new();
    for page_number in document.get_pages().keys() {
        let page_text = document.extract_text(&[*page_number])?;
        raw_text.push_str(&page_text);
        raw_text.push('\n');
    }
    Ok(raw_text)
}

/// Extract the raw paragraph text of a DOCX document, one line per paragraph.
fn extract_docx_text(bytes: &[u8]) -> Result<String, FormatError> {
    let docx = docx_rs::read_docx(bytes).map_err(FormatError::new)?;
    let mut raw_text = String::new();
    for child in &docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            push_paragraph_text(paragraph, &mut raw_text);
            raw_text.push('\n');
        }
    }
    Ok(raw_text)
}

fn push_paragraph_text(paragraph: &docx_rs::Paragraph, out: &mut String) {
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for content in &run.children {
                match content {
                    docx_rs::RunChild::Text(text) => out.push_str(&text.text),
                    docx_rs::RunChild::Tab(_) => out.push(' '),
                    docx_rs::RunChild::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
    }
}
