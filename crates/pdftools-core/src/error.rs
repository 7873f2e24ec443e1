use thiserror::Error;

/// Error taxonomy for the transformation engine.
///
/// `Validation` and `InvalidRange` report bad user input and are raised before
/// any file is touched. `CorruptDocument` and `Serialization` are codec-level
/// failures that abort the current batch item. The two password variants are
/// kept distinct so the UI can tell a locked document apart from a broken one.
#[derive(Error, Debug)]
pub enum PdfToolError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Failed to parse PDF: {0}")]
    CorruptDocument(String),

    #[error("Document is password protected")]
    PasswordRequired,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Failed to serialize PDF: {0}")]
    Serialization(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),
}
