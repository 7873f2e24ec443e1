//! Document concatenation.
//!
//! Combines the full page sequences of several documents, in input order,
//! into one output document.

use crate::document::DocumentHandle;
use crate::error::PdfToolError;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Merge the inputs into one document, preserving input order.
///
/// Requires at least two documents; merging fewer is a user-input error the
/// orchestrator reports before any file is touched, but the engine enforces
/// it again here.
///
/// The algorithm keeps the first document as the base, then for each
/// remaining source offsets every object ID past the destination's maximum,
/// imports the remapped objects, and appends the source's page references to
/// the destination page tree.
pub fn merge_documents(handles: Vec<DocumentHandle>) -> Result<DocumentHandle, PdfToolError> {
    if handles.len() < 2 {
        return Err(PdfToolError::Validation(
            "Merge requires at least 2 documents".into(),
        ));
    }

    let mut sources: Vec<Document> = handles.into_iter().map(|h| h.into_document()).collect();

    let mut dest = sources.remove(0);
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = page_references(&dest);

    for source in sources {
        let source_pages = page_references(&source);
        let id_offset = dest_max_id;

        let mut remapped = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped.insert(new_id, offset_references(object, id_offset));
        }
        for (id, object) in remapped {
            dest.objects.insert(id, object);
        }

        for old_ref in source_pages {
            dest_page_refs.push((old_ref.0 + id_offset, old_ref.1));
        }

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    rebuild_page_tree(&mut dest, dest_page_refs)?;
    dest.max_id = dest_max_id;
    dest.compress();

    Ok(DocumentHandle::from_document("merged.pdf", dest))
}

/// Page object references, in page order.
fn page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Recursively shift every object reference by `offset`.
fn offset_references(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| offset_references(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = offset_references(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = offset_references(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the destination's page tree at the combined page list.
fn rebuild_page_tree(doc: &mut Document, page_refs: Vec<ObjectId>) -> Result<(), PdfToolError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(|r| r.as_reference())
        .map_err(|_| PdfToolError::Operation("No Root in trailer".into()))?;

    let pages_id = doc
        .objects
        .get(&catalog_id)
        .ok_or_else(|| PdfToolError::Operation("Catalog not found".into()))?
        .as_dict()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|p| p.as_reference())
        .map_err(|_| PdfToolError::Operation("Catalog has no Pages reference".into()))?;

    if let Some(Object::Dictionary(pages_dict)) = doc.objects.get_mut(&pages_id) {
        let kids = page_refs
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>();
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        Ok(())
    } else {
        Err(PdfToolError::Operation("Invalid pages dictionary".into()))
    }
}
