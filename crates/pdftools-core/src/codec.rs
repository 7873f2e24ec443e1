//! The document codec boundary.
//!
//! All byte-level PDF parsing and serialization goes through this module so
//! the rest of the engine only ever sees an in-memory `lopdf::Document`.
//! Codec failures are classified here: an unreadable buffer is
//! `CorruptDocument`, an encrypted one is `PasswordRequired`.

use crate::error::PdfToolError;
use lopdf::Document;
use serde::Serialize;

/// Decode a PDF buffer, rejecting encrypted documents.
pub fn decode(bytes: &[u8]) -> Result<Document, PdfToolError> {
    let doc = decode_encrypted(bytes)?;
    if doc.is_encrypted() {
        return Err(PdfToolError::PasswordRequired);
    }
    Ok(doc)
}

/// Decode a PDF buffer without rejecting encrypted documents.
///
/// Only the unlock path should use this; everything else wants [`decode`].
pub fn decode_encrypted(bytes: &[u8]) -> Result<Document, PdfToolError> {
    Document::load_mem(bytes).map_err(|e| PdfToolError::CorruptDocument(e.to_string()))
}

/// Serialize a document back to bytes.
pub fn encode(doc: &mut Document) -> Result<Vec<u8>, PdfToolError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolError::Serialization(e.to_string()))?;
    Ok(buffer)
}

/// Metadata extracted when a file enters the engine.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DocumentInfo {
    /// Number of pages in the document
    pub page_count: usize,
    /// PDF version string from the header (e.g. "1.7")
    pub version: String,
    /// Whether the document carries an encryption dictionary
    pub encrypted: bool,
    /// Source size in bytes
    pub size_bytes: usize,
    /// Document title from the Info dictionary, if present
    pub title: Option<String>,
    /// Document author from the Info dictionary, if present
    pub author: Option<String>,
}

/// Validate a buffer and extract [`DocumentInfo`].
///
/// Encrypted documents are reported rather than rejected here; the caller
/// decides whether the operation at hand can work with them.
pub fn probe(bytes: &[u8]) -> Result<DocumentInfo, PdfToolError> {
    quick_validate(bytes)?;

    let document = decode_encrypted(bytes)?;
    let page_count = document.get_pages().len();
    if page_count == 0 {
        return Err(PdfToolError::CorruptDocument("PDF has no pages".into()));
    }

    let (title, author) = info_strings(&document);

    Ok(DocumentInfo {
        page_count,
        version: header_version(bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title,
        author,
    })
}

/// Cheap structural checks that run before full parsing.
pub fn quick_validate(bytes: &[u8]) -> Result<(), PdfToolError> {
    if bytes.len() < 8 {
        return Err(PdfToolError::CorruptDocument(
            "File too small to be a valid PDF".into(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfToolError::CorruptDocument(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    // The EOF marker should sit near the end of the file.
    let tail = if bytes.len() > 1024 {
        &bytes[bytes.len() - 1024..]
    } else {
        bytes
    };
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfToolError::CorruptDocument(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }

    Ok(())
}

/// Parse the version out of the "%PDF-x.y" header.
fn header_version(bytes: &[u8]) -> String {
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}

/// Pull Title and Author out of the trailer's Info dictionary.
fn info_strings(document: &Document) -> (Option<String>, Option<String>) {
    let mut title = None;
    let mut author = None;

    if let Ok(info_ref) = document.trailer.get(b"Info") {
        if let Ok(info_id) = info_ref.as_reference() {
            if let Some(info_obj) = document.objects.get(&info_id) {
                if let Ok(info_dict) = info_obj.as_dict() {
                    title = dict_string(info_dict, b"Title");
                    author = dict_string(info_dict, b"Author");
                }
            }
        }
    }

    (title, author)
}

fn dict_string(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).ok()?.as_str().ok()?;
    let decoded = String::from_utf8_lossy(bytes);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}
