//! WASM bindings for the PDF transformation engine
//!
//! This module provides a stateful, session-based API: the file list
//! and job status live in Rust, JavaScript only handles DOM events and
//! downloads.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PdfToolSession } from './pkg/pdftools_wasm.js';
//!
//! await init();
//!
//! const session = new PdfToolSession();
//! session.setProgressCallback((state) => updateUI(state));
//! session.setOutputCallback((name, bytes, mime) => downloadBlob(name, bytes, mime));
//! session.addFile("a.pdf", bytesA);
//! session.addFile("b.pdf", bytesB);
//! session.execute({ type: "Merge" });
//! ```
//!
//! The `execute` argument mirrors the engine's operation enum, e.g.
//! `{ type: "Edit", edit: { type: "Watermark", text: "DRAFT" } }`.

pub mod session;

use wasm_bindgen::prelude::*;

pub use session::PdfToolSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Quick validation check for a PDF file
/// Returns Ok(()) if valid, Err with message if not
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    pdftools_core::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Get detailed PDF info without creating a session
/// Useful for showing file info before the user commits to an operation
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = pdftools_core::probe(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Get page count from PDF bytes (convenience function)
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdftools_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        let version = get_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(2621440), "2.5 MB");
    }
}
