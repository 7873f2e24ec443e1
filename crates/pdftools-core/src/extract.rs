//! Page extraction (the split tool).

use crate::document::DocumentHandle;
use crate::error::PdfToolError;
use crate::selection::PageSelection;
use serde::{Deserialize, Serialize};

/// Which pages the split tool pulls out of a document.
///
/// The sub-mode is a configuration choice on the job; the engine never
/// infers it from the range text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ExtractMode {
    /// One output with exactly the pages matched by the range expression.
    Range { pages: String },
    /// One single-page output per page of the source.
    EachPage,
    /// The first page only.
    First,
    /// The last page only.
    Last,
}

/// Run an extraction, producing one or more new documents.
///
/// The source handle is never mutated; every output is derived from a copy.
pub fn extract(
    source: &DocumentHandle,
    mode: &ExtractMode,
) -> Result<Vec<DocumentHandle>, PdfToolError> {
    let total = source.page_count();

    match mode {
        ExtractMode::Range { pages } => {
            let selection = PageSelection::parse(pages, total)?;
            if selection.is_empty() {
                return Err(PdfToolError::Validation(
                    "Page range matches no pages".into(),
                ));
            }
            Ok(vec![source.extract_pages(&selection)?])
        }
        ExtractMode::EachPage => {
            let mut outputs = Vec::with_capacity(total);
            for index in 0..total {
                outputs.push(single_page(source, index, total)?);
            }
            Ok(outputs)
        }
        ExtractMode::First => Ok(vec![single_page(source, 0, total)?]),
        ExtractMode::Last => {
            if total == 0 {
                return Err(PdfToolError::InvalidRange("Document has no pages".into()));
            }
            Ok(vec![single_page(source, total - 1, total)?])
        }
    }
}

fn single_page(
    source: &DocumentHandle,
    index: usize,
    total: usize,
) -> Result<DocumentHandle, PdfToolError> {
    let selection = PageSelection::parse(&format!("{}", index + 1), total)?;
    if selection.is_empty() {
        return Err(PdfToolError::InvalidRange(format!(
            "Page {} does not exist",
            index + 1
        )));
    }
    source.extract_pages(&selection)
}
