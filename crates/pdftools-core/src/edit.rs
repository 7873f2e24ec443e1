//! Page-level edit operations.
//!
//! The edit tool's operation kind is chosen at runtime, so the variants are a
//! tagged enum dispatched through [`apply_edit`] rather than separate entry
//! points per kind.

use crate::document::{normalize_rotation, DocumentHandle};
use crate::error::PdfToolError;
use crate::selection::PageSelection;
use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

/// Font size for plain added text.
const TEXT_SIZE: f64 = 24.0;
/// Font size for watermark text.
const WATERMARK_SIZE: f64 = 48.0;
/// Watermark opacity.
const WATERMARK_ALPHA: f32 = 0.3;
/// sin/cos of the 45 degree watermark slant.
const DIAGONAL: f32 = 0.7071;

/// One edit applied uniformly to a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EditOperation {
    /// Rotate every page by a fixed delta (90, 180 or 270 degrees).
    Rotate { angle: i32 },
    /// Delete the pages matched by a range expression.
    Delete { pages: String },
    /// Stamp a text run at the top-left of every page.
    AddText { text: String },
    /// Stamp a diagonal, semi-transparent watermark across every page.
    Watermark { text: String },
}

/// Apply one edit to a document in place.
pub fn apply_edit(handle: &mut DocumentHandle, op: &EditOperation) -> Result<(), PdfToolError> {
    match op {
        EditOperation::Rotate { angle } => rotate_all(handle, *angle),
        EditOperation::Delete { pages } => {
            let selection = PageSelection::parse(pages, handle.page_count())?;
            if selection.is_empty() {
                return Err(PdfToolError::Validation(
                    "No pages matched the delete range".into(),
                ));
            }
            handle.delete_pages(&selection)
        }
        EditOperation::AddText { text } => {
            if text.is_empty() {
                return Err(PdfToolError::Validation("No text to add".into()));
            }
            add_text(handle, text)
        }
        EditOperation::Watermark { text } => {
            if text.is_empty() {
                return Err(PdfToolError::Validation("No watermark text".into()));
            }
            add_watermark(handle, text)
        }
    }
}

/// New rotation = (current + delta) mod 360 on every page.
fn rotate_all(handle: &mut DocumentHandle, delta: i32) -> Result<(), PdfToolError> {
    if !matches!(delta, 90 | 180 | 270) {
        return Err(PdfToolError::Validation(format!(
            "Rotation angle must be 90, 180 or 270, got {}",
            delta
        )));
    }
    for index in 0..handle.page_count() {
        let current = handle.page_rotation(index)?;
        handle.set_page_rotation(index, normalize_rotation(current + delta))?;
    }
    Ok(())
}

/// 24pt Helvetica at (50, height - 50) on every page.
fn add_text(handle: &mut DocumentHandle, text: &str) -> Result<(), PdfToolError> {
    for index in 0..handle.page_count() {
        let (_, height) = handle.page_size(index)?;
        let page_id = handle.page_id(index)?;
        let doc = handle.document_mut();

        let font = register_font(doc, page_id)?;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(font.as_bytes().to_vec()),
                        Object::Real(TEXT_SIZE as f32),
                    ],
                ),
                Operation::new(
                    "Td",
                    vec![Object::Real(50.0), Object::Real((height - 50.0) as f32)],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        escape_pdf_text(text),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        append_content(doc, page_id, content)?;
    }
    Ok(())
}

/// Light-gray 48pt text, rotated 45 degrees, 30% opacity, roughly centered.
///
/// Centering uses the width heuristic `len * size / 4` instead of real glyph
/// metrics; the imprecision is acceptable for a watermark.
fn add_watermark(handle: &mut DocumentHandle, text: &str) -> Result<(), PdfToolError> {
    for index in 0..handle.page_count() {
        let (width, height) = handle.page_size(index)?;
        let x = width / 2.0 - (text.len() as f64 * WATERMARK_SIZE) / 4.0;
        let y = height / 2.0;

        let page_id = handle.page_id(index)?;
        let doc = handle.document_mut();

        let font = register_font(doc, page_id)?;
        let gstate = register_opacity(doc, page_id, WATERMARK_ALPHA)?;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("gs", vec![Object::Name(gstate.as_bytes().to_vec())]),
                Operation::new(
                    "rg",
                    vec![Object::Real(0.95), Object::Real(0.95), Object::Real(0.95)],
                ),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(font.as_bytes().to_vec()),
                        Object::Real(WATERMARK_SIZE as f32),
                    ],
                ),
                Operation::new(
                    "Tm",
                    vec![
                        Object::Real(DIAGONAL),
                        Object::Real(DIAGONAL),
                        Object::Real(-DIAGONAL),
                        Object::Real(DIAGONAL),
                        Object::Real(x as f32),
                        Object::Real(y as f32),
                    ],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        escape_pdf_text(text),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        append_content(doc, page_id, content)?;
    }
    Ok(())
}

/// Escape a text run for a literal PDF string.
fn escape_pdf_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for &b in text.as_bytes() {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

/// Register a Helvetica font in the page's resources; returns the
/// resource name to reference from content.
fn register_font(doc: &mut Document, page_id: ObjectId) -> Result<String, PdfToolError> {
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let name = "PtF1".to_string();
    set_resource(doc, page_id, "Font", &name, Object::Reference(font_id))?;
    Ok(name)
}

/// Register an ExtGState carrying fill/stroke alpha.
fn register_opacity(
    doc: &mut Document,
    page_id: ObjectId,
    alpha: f32,
) -> Result<String, PdfToolError> {
    let gs_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(alpha)),
        ("CA", Object::Real(alpha)),
    ]));
    let name = "PtGS1".to_string();
    set_resource(doc, page_id, "ExtGState", &name, Object::Reference(gs_id))?;
    Ok(name)
}

/// Where a page's resource dictionary lives.
enum ResourceSlot {
    Inline,
    Indirect(ObjectId),
}

/// Make sure the page has a Resources entry and report where it is,
/// cloning an inherited dictionary down from the parent node if needed.
fn resource_slot(doc: &mut Document, page_id: ObjectId) -> Result<ResourceSlot, PdfToolError> {
    let inherited: Option<Object> = {
        let page_dict = doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| PdfToolError::Operation(e.to_string()))?;
        match page_dict.get(b"Resources") {
            Ok(Object::Reference(id)) => return Ok(ResourceSlot::Indirect(*id)),
            Ok(Object::Dictionary(_)) => return Ok(ResourceSlot::Inline),
            _ => page_dict
                .get(b"Parent")
                .ok()
                .and_then(|p| p.as_reference().ok())
                .and_then(|pid| doc.objects.get(&pid))
                .and_then(|o| o.as_dict().ok())
                .and_then(|d| d.get(b"Resources").ok())
                .cloned(),
        }
    };

    if let Some(Object::Reference(id)) = inherited {
        let page_dict = page_dict_mut(doc, page_id)?;
        page_dict.set("Resources", Object::Reference(id));
        return Ok(ResourceSlot::Indirect(id));
    }

    let resources = match inherited {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };
    let page_dict = page_dict_mut(doc, page_id)?;
    page_dict.set("Resources", Object::Dictionary(resources));
    Ok(ResourceSlot::Inline)
}

/// Insert `value` under `category`/`name` in the page's resources.
fn set_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    value: Object,
) -> Result<(), PdfToolError> {
    let slot = resource_slot(doc, page_id)?;
    let resources: &mut Dictionary = match slot {
        ResourceSlot::Inline => {
            let page_dict = page_dict_mut(doc, page_id)?;
            page_dict
                .get_mut(b"Resources")
                .and_then(|r| r.as_dict_mut())
                .map_err(|e| PdfToolError::Operation(e.to_string()))?
        }
        ResourceSlot::Indirect(id) => doc
            .get_object_mut(id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| PdfToolError::Operation(e.to_string()))?,
    };

    match resources.get_mut(category.as_bytes()) {
        Ok(Object::Dictionary(existing)) => {
            existing.set(name, value);
        }
        _ => {
            let mut fresh = Dictionary::new();
            fresh.set(name, value);
            resources.set(category, Object::Dictionary(fresh));
        }
    }
    Ok(())
}

/// Append a content stream to a page, preserving the existing streams.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Content,
) -> Result<(), PdfToolError> {
    let encoded = content
        .encode()
        .map_err(|e| PdfToolError::Operation(e.to_string()))?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let page_dict = page_dict_mut(doc, page_id)?;
    let new_contents = match page_dict.get(b"Contents") {
        Ok(Object::Array(existing)) => {
            let mut refs = existing.clone();
            refs.push(Object::Reference(stream_id));
            Object::Array(refs)
        }
        Ok(existing @ Object::Reference(_)) => Object::Array(vec![
            existing.clone(),
            Object::Reference(stream_id),
        ]),
        _ => Object::Reference(stream_id),
    };
    page_dict.set("Contents", new_contents);
    Ok(())
}

fn page_dict_mut(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<&mut Dictionary, PdfToolError> {
    doc.get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| PdfToolError::Operation(e.to_string()))
}
