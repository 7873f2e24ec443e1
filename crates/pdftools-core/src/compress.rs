//! Whole-document compression.

use crate::document::DocumentHandle;
use crate::error::PdfToolError;
use serde::{Deserialize, Serialize};

/// Requested compression strength. Advisory: recorded for the caller's
/// UI, but every level performs the same prune-and-deflate pass since
/// lopdf exposes a single stream codec.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Drop unreferenced objects and flate-compress the content streams.
pub fn compress_document(
    handle: &mut DocumentHandle,
    _level: CompressionLevel,
) -> Result<(), PdfToolError> {
    let doc = handle.document_mut();
    doc.prune_objects();
    doc.compress();
    Ok(())
}
