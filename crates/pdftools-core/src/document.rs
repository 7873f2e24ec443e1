//! Operation-agnostic wrapper around one loaded document.
//!
//! A `DocumentHandle` owns its `lopdf::Document` exclusively; transformations
//! either mutate the handle in place (rotate, delete, annotate) or derive a
//! new handle without touching the source (extract).

use crate::codec;
use crate::error::PdfToolError;
use crate::selection::PageSelection;
use lopdf::{Document, Object, ObjectId};

/// One loaded document plus its source name.
#[derive(Debug)]
pub struct DocumentHandle {
    name: String,
    doc: Document,
}

impl DocumentHandle {
    /// Load and validate a PDF buffer.
    ///
    /// Fails with `CorruptDocument` when the codec cannot parse the buffer
    /// and `PasswordRequired` when the document is encrypted.
    pub fn load(name: &str, bytes: &[u8]) -> Result<Self, PdfToolError> {
        let doc = codec::decode(bytes)?;
        Ok(Self {
            name: name.to_string(),
            doc,
        })
    }

    /// Wrap an already-decoded document.
    pub(crate) fn from_document(name: &str, doc: Document) -> Self {
        Self {
            name: name.to_string(),
            doc,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Width and height of a page in points, following the MediaBox up to
    /// the parent node and defaulting to US Letter when absent.
    pub fn page_size(&self, index: usize) -> Result<(f64, f64), PdfToolError> {
        let page_id = self.page_id(index)?;
        let page_dict = self.page_dict(page_id)?;
        let media_box = self.media_box(page_dict);
        Ok((media_box[2] - media_box[0], media_box[3] - media_box[1]))
    }

    /// Rotation of a page in degrees, normalized to {0, 90, 180, 270}.
    pub fn page_rotation(&self, index: usize) -> Result<i32, PdfToolError> {
        let page_id = self.page_id(index)?;
        let page_dict = self.page_dict(page_id)?;

        if let Ok(angle) = page_dict.get(b"Rotate").and_then(|r| r.as_i64()) {
            return Ok(normalize_rotation(angle as i32));
        }
        // Rotate is inheritable from the page tree node.
        if let Some(parent_dict) = self.parent_dict(page_dict) {
            if let Ok(angle) = parent_dict.get(b"Rotate").and_then(|r| r.as_i64()) {
                return Ok(normalize_rotation(angle as i32));
            }
        }
        Ok(0)
    }

    /// Set a page's rotation, normalized mod 360.
    pub fn set_page_rotation(&mut self, index: usize, angle: i32) -> Result<(), PdfToolError> {
        let page_id = self.page_id(index)?;
        let page = self
            .doc
            .get_object_mut(page_id)
            .map_err(|e| PdfToolError::Operation(e.to_string()))?;
        let dict = page
            .as_dict_mut()
            .map_err(|_| PdfToolError::Operation("Page is not a dictionary".into()))?;
        dict.set(
            "Rotate",
            Object::Integer(i64::from(normalize_rotation(angle))),
        );
        Ok(())
    }

    /// Remove the selected pages, strictly by descending index.
    ///
    /// The ordering is load-bearing: removing low-to-high shifts every
    /// subsequent index after the first removal and deletes the wrong pages.
    pub fn delete_pages(&mut self, selection: &PageSelection) -> Result<(), PdfToolError> {
        if selection.is_empty() {
            return Err(PdfToolError::Validation(
                "No pages selected for deletion".into(),
            ));
        }
        if selection.len() >= self.page_count() {
            return Err(PdfToolError::Validation(
                "Cannot delete every page of a document".into(),
            ));
        }

        for index in selection.descending() {
            // lopdf numbers pages from 1.
            self.doc.delete_pages(&[(index + 1) as u32]);
        }
        self.doc.prune_objects();
        Ok(())
    }

    /// Derive a new document containing exactly the selected pages, in
    /// selection order. The source handle is never mutated: the copy is taken
    /// from a clone and the complement is deleted high-to-low.
    pub fn extract_pages(&self, selection: &PageSelection) -> Result<Self, PdfToolError> {
        if selection.is_empty() {
            return Err(PdfToolError::Validation("No pages selected".into()));
        }

        let mut new_doc = self.doc.clone();
        for index in selection.complement().descending() {
            new_doc.delete_pages(&[(index + 1) as u32]);
        }
        new_doc.prune_objects();
        new_doc.compress();

        Ok(Self::from_document(&self.name, new_doc))
    }

    /// Serialize back to bytes. Deterministic for an unchanged document.
    pub fn save(&mut self) -> Result<Vec<u8>, PdfToolError> {
        codec::encode(&mut self.doc)
    }

    /// lopdf object id of the page at a zero-based index.
    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId, PdfToolError> {
        let pages = self.doc.get_pages();
        pages
            .get(&((index + 1) as u32))
            .copied()
            .ok_or_else(|| {
                PdfToolError::Operation(format!(
                    "Page index {} out of bounds (document has {} pages)",
                    index,
                    pages.len()
                ))
            })
    }

    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub(crate) fn into_document(self) -> Document {
        self.doc
    }

    fn page_dict(&self, page_id: ObjectId) -> Result<&lopdf::Dictionary, PdfToolError> {
        self.doc
            .get_object(page_id)
            .and_then(|obj| obj.as_dict())
            .map_err(|e| PdfToolError::Operation(e.to_string()))
    }

    fn parent_dict(&self, page_dict: &lopdf::Dictionary) -> Option<&lopdf::Dictionary> {
        let parent_id = page_dict.get(b"Parent").ok()?.as_reference().ok()?;
        self.doc.objects.get(&parent_id)?.as_dict().ok()
    }

    fn media_box(&self, page_dict: &lopdf::Dictionary) -> [f64; 4] {
        if let Ok(array) = page_dict.get(b"MediaBox").and_then(|b| b.as_array()) {
            if let Some(parsed) = parse_box_array(array) {
                return parsed;
            }
        }
        if let Some(parent_dict) = self.parent_dict(page_dict) {
            if let Ok(array) = parent_dict.get(b"MediaBox").and_then(|b| b.as_array()) {
                if let Some(parsed) = parse_box_array(array) {
                    return parsed;
                }
            }
        }
        // US Letter
        [0.0, 0.0, 612.0, 792.0]
    }
}

/// Normalize a rotation angle into [0, 360).
pub fn normalize_rotation(angle: i32) -> i32 {
    angle.rem_euclid(360)
}

fn parse_box_array(array: &[Object]) -> Option<[f64; 4]> {
    if array.len() != 4 {
        return None;
    }
    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => f64::from(*n),
            _ => return None,
        };
    }
    Some(result)
}
