//! Stateful PDF session management
//!
//! Holds the file list and runs batch jobs in Rust, minimizing
//! JavaScript state management. Outputs and progress reach JavaScript
//! through callbacks set on the session.

use js_sys::Function;
use pdftools_core::codec::DocumentInfo;
use pdftools_core::{
    probe, BatchJob, BatchRunner, FileSink, InputFile, OperationKind, PdfToolError,
    ProgressObserver, ProgressState,
};
use wasm_bindgen::prelude::*;

/// File entry with metadata
struct FileEntry {
    name: String,
    bytes: Vec<u8>,
    info: DocumentInfo,
}

/// Stateful session holding the selected files in Rust memory
#[wasm_bindgen]
pub struct PdfToolSession {
    files: Vec<FileEntry>,
    runner: BatchRunner,
    progress_callback: Option<Function>,
    output_callback: Option<Function>,
}

#[wasm_bindgen]
impl PdfToolSession {
    /// Create an empty session
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            runner: BatchRunner::new(),
            progress_callback: None,
            output_callback: None,
        }
    }

    /// Set a progress callback function
    /// Callback signature: (state: {status, percent, message}) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: Function) {
        self.progress_callback = Some(callback);
    }

    /// Set the output callback that receives finished files
    /// Callback signature: (name: string, bytes: Uint8Array, mime: string) => void
    #[wasm_bindgen(js_name = setOutputCallback)]
    pub fn set_output_callback(&mut self, callback: Function) {
        self.output_callback = Some(callback);
    }

    /// Validate a file and add it to the session
    /// Returns the file's info on success
    #[wasm_bindgen(js_name = addFile)]
    pub fn add_file(&mut self, name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let info = probe(bytes).map_err(to_js)?;
        self.files.push(FileEntry {
            name: name.to_string(),
            bytes: bytes.to_vec(),
            info: info.clone(),
        });

        serde_wasm_bindgen::to_value(&info)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Remove a file by index
    #[wasm_bindgen(js_name = removeFile)]
    pub fn remove_file(&mut self, index: usize) -> Result<(), JsValue> {
        if index >= self.files.len() {
            return Err(JsValue::from_str("File index out of bounds"));
        }
        self.files.remove(index);
        Ok(())
    }

    /// Drop every file from the session
    #[wasm_bindgen(js_name = clearFiles)]
    pub fn clear_files(&mut self) {
        self.files.clear();
    }

    /// Number of files currently held
    #[wasm_bindgen(js_name = fileCount)]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total page count across all files
    #[wasm_bindgen(js_name = totalPageCount)]
    pub fn total_page_count(&self) -> u32 {
        self.files.iter().map(|f| f.info.page_count as u32).sum()
    }

    /// Run an operation over the session's files
    /// `operation` mirrors the engine enum: `{ type: "Merge" }`,
    /// `{ type: "Extract", mode: { type: "Range", pages: "1-3" } }`, ...
    pub fn execute(&mut self, operation: JsValue) -> Result<(), JsValue> {
        let operation: OperationKind = serde_wasm_bindgen::from_value(operation)
            .map_err(|e| JsValue::from_str(&format!("Invalid operation: {}", e)))?;

        let job = BatchJob {
            operation,
            inputs: self
                .files
                .iter()
                .map(|f| InputFile {
                    name: f.name.clone(),
                    bytes: f.bytes.clone(),
                })
                .collect(),
        };

        let mut sink = CallbackSink {
            callback: self.output_callback.clone(),
        };
        let mut observer = CallbackObserver {
            callback: self.progress_callback.clone(),
        };
        self.runner.run(&job, &mut sink, &mut observer).map_err(|e| {
            web_sys::console::error_1(&JsValue::from_str(&e.to_string()));
            to_js(e)
        })
    }
}

impl Default for PdfToolSession {
    fn default() -> Self {
        Self::new()
    }
}

fn to_js(err: PdfToolError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Forwards finished files to the JS output callback.
struct CallbackSink {
    callback: Option<Function>,
}

impl FileSink for CallbackSink {
    fn emit(&mut self, name: &str, bytes: &[u8], mime: &str) -> Result<(), PdfToolError> {
        if let Some(ref callback) = self.callback {
            let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
            array.copy_from(bytes);
            callback
                .call3(
                    &JsValue::null(),
                    &JsValue::from_str(name),
                    &array.into(),
                    &JsValue::from_str(mime),
                )
                .map_err(|_| {
                    PdfToolError::Operation(format!("Output callback failed for {}", name))
                })?;
        }
        Ok(())
    }
}

/// Forwards progress snapshots to the JS progress callback.
struct CallbackObserver {
    callback: Option<Function>,
}

impl ProgressObserver for CallbackObserver {
    fn on_progress(&mut self, state: &ProgressState) {
        if let Some(ref callback) = self.callback {
            if let Ok(value) = serde_wasm_bindgen::to_value(state) {
                let _ = callback.call1(&JsValue::null(), &value);
            }
        }
    }
}
