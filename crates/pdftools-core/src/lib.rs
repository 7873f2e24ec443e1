//! Client-side PDF transformation engine
//!
//! This crate provides PDF manipulation using lopdf: merging, page
//! extraction, page edits (rotate, delete, text, watermark),
//! compression, format-conversion stubs, password protection and
//! removal, all driven through a batch runner suitable for a wasm
//! front end.

pub mod batch;
pub mod codec;
pub mod compress;
pub mod convert;
pub mod crypto;
pub mod document;
pub mod edit;
pub mod error;
pub mod extract;
pub mod merge;
pub mod security;
pub mod selection;

#[cfg(test)]
pub(crate) mod testdoc;

pub use batch::{
    BatchJob, BatchRunner, BatchStatus, FileSink, InputFile, OperationKind, ProgressObserver,
    ProgressState, PDF_MIME,
};
pub use codec::{probe, quick_validate, DocumentInfo};
pub use compress::CompressionLevel;
pub use convert::ConvertTarget;
pub use document::DocumentHandle;
pub use edit::EditOperation;
pub use error::PdfToolError;
pub use extract::ExtractMode;
pub use merge::merge_documents;
pub use security::Permissions;
pub use selection::PageSelection;

/// Parse PDF bytes and return the page count.
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfToolError> {
    let doc = codec::decode_encrypted(bytes)?;
    Ok(doc.get_pages().len() as u32)
}
