//! Batch orchestration: one operation applied across a list of input
//! files, with progress reporting and sink-based output delivery.
//!
//! Preconditions are validated before any file is touched. Processing
//! is sequential and aborts on the first per-file failure; outputs
//! emitted before the failure are kept.

use crate::compress::{compress_document, CompressionLevel};
use crate::convert::{convert, ConvertTarget};
use crate::document::DocumentHandle;
use crate::edit::{apply_edit, EditOperation};
use crate::error::PdfToolError;
use crate::extract::{extract, ExtractMode};
use crate::merge::merge_documents;
use crate::security::{protect, unlock, Permissions};
use serde::{Deserialize, Serialize};

pub const PDF_MIME: &str = "application/pdf";

/// A file handed to the engine, name and raw bytes.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// The operation a batch job performs, with its per-kind options.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum OperationKind {
    Merge,
    Extract {
        mode: ExtractMode,
    },
    Edit {
        edit: EditOperation,
    },
    Compress {
        #[serde(default)]
        level: CompressionLevel,
    },
    Convert {
        target: ConvertTarget,
    },
    Protect {
        password: String,
        #[serde(default)]
        confirm_password: Option<String>,
        #[serde(default)]
        permissions: Permissions,
    },
    Unlock {
        password: String,
    },
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub operation: OperationKind,
    pub inputs: Vec<InputFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Idle,
    Processing,
    Success,
    Error,
}

/// Snapshot pushed to the observer after every step. `percent` never
/// decreases within one job.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressState {
    pub status: BatchStatus,
    pub percent: u8,
    pub message: String,
}

pub trait ProgressObserver {
    fn on_progress(&mut self, state: &ProgressState);
}

/// Receives finished output files. The wasm app forwards these to a
/// JS download callback; tests collect them in memory.
pub trait FileSink {
    fn emit(&mut self, name: &str, bytes: &[u8], mime: &str) -> Result<(), PdfToolError>;
}

/// Runs one job at a time. Holds no document state across jobs, only
/// the status of the most recent run.
pub struct BatchRunner {
    status: BatchStatus,
    percent: u8,
}

impl BatchRunner {
    pub fn new() -> Self {
        Self {
            status: BatchStatus::Idle,
            percent: 0,
        }
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn run<S: FileSink, O: ProgressObserver>(
        &mut self,
        job: &BatchJob,
        sink: &mut S,
        observer: &mut O,
    ) -> Result<(), PdfToolError> {
        if self.status == BatchStatus::Processing {
            return Err(PdfToolError::Operation(
                "A job is already running".into(),
            ));
        }

        // Precondition failures go straight to the error state without
        // ever entering processing or touching a file.
        self.percent = 0;
        if let Err(err) = validate_job(job) {
            return self.fail(observer, err);
        }

        self.status = BatchStatus::Processing;
        self.report(observer, "Starting");

        match self.execute(job, sink, observer) {
            Ok(()) => {
                self.status = BatchStatus::Success;
                self.percent = 100;
                self.report(observer, "Done");
                Ok(())
            }
            Err(err) => self.fail(observer, err),
        }
    }

    fn execute<S: FileSink, O: ProgressObserver>(
        &mut self,
        job: &BatchJob,
        sink: &mut S,
        observer: &mut O,
    ) -> Result<(), PdfToolError> {
        let total = job.inputs.len();
        match &job.operation {
            OperationKind::Merge => {
                // Loading each input is one step, the merge itself the last.
                let mut handles = Vec::with_capacity(total);
                for (done, input) in job.inputs.iter().enumerate() {
                    handles.push(load_input(input)?);
                    self.advance(observer, done + 1, total + 1, &input.name);
                }
                let mut merged = merge_documents(handles)?;
                let bytes = merged.save()?;
                sink.emit("merged.pdf", &bytes, PDF_MIME)?;
                self.advance(observer, total + 1, total + 1, "merged.pdf");
                Ok(())
            }
            OperationKind::Extract { mode } => {
                let input = job.inputs.first().ok_or_else(|| {
                    PdfToolError::Validation("Extraction takes exactly one file".into())
                })?;
                let handle = load_input(input)?;
                let mut parts = extract(&handle, mode)?;
                for (index, part) in parts.iter_mut().enumerate() {
                    let name = extract_output_name(mode, index);
                    let bytes = part.save()?;
                    sink.emit(&name, &bytes, PDF_MIME)?;
                }
                self.advance(observer, 1, 1, &input.name);
                Ok(())
            }
            _ => {
                for (done, input) in job.inputs.iter().enumerate() {
                    process_one(input, &job.operation, sink)?;
                    self.advance(observer, done + 1, total, &input.name);
                }
                Ok(())
            }
        }
    }

    fn advance<O: ProgressObserver>(
        &mut self,
        observer: &mut O,
        completed: usize,
        total: usize,
        message: &str,
    ) {
        let percent = ((completed as f64 / total as f64) * 100.0).round() as u8;
        self.percent = self.percent.max(percent);
        self.report(observer, message);
    }

    fn report<O: ProgressObserver>(&self, observer: &mut O, message: &str) {
        observer.on_progress(&ProgressState {
            status: self.status,
            percent: self.percent,
            message: message.to_string(),
        });
    }

    fn fail<O: ProgressObserver>(
        &mut self,
        observer: &mut O,
        err: PdfToolError,
    ) -> Result<(), PdfToolError> {
        self.status = BatchStatus::Error;
        let message = err.to_string();
        self.report(observer, &message);
        Err(err)
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Transform a single input and emit its outputs. Only the per-file
/// operation kinds reach this point.
fn process_one<S: FileSink>(
    input: &InputFile,
    operation: &OperationKind,
    sink: &mut S,
) -> Result<(), PdfToolError> {
    match operation {
        OperationKind::Edit { edit } => {
            let mut handle = load_input(input)?;
            apply_edit(&mut handle, edit)?;
            let bytes = handle.save()?;
            sink.emit(&suffixed(&input.name, "-edited"), &bytes, PDF_MIME)
        }
        OperationKind::Compress { level } => {
            let mut handle = load_input(input)?;
            compress_document(&mut handle, *level)?;
            let bytes = handle.save()?;
            sink.emit(&suffixed(&input.name, "-compressed"), &bytes, PDF_MIME)
        }
        OperationKind::Convert { target } => {
            let handle = load_input(input)?;
            for output in convert(&handle, target, stem(&input.name))? {
                sink.emit(&output.name, &output.bytes, output.mime)?;
            }
            Ok(())
        }
        OperationKind::Protect {
            password,
            permissions,
            ..
        } => {
            let mut handle = load_input(input)?;
            protect(&mut handle, password, permissions)?;
            let bytes = handle.save()?;
            sink.emit(&suffixed(&input.name, "-protected"), &bytes, PDF_MIME)
        }
        OperationKind::Unlock { password } => {
            let mut handle = unlock(&input.name, &input.bytes, password)?;
            let bytes = handle.save()?;
            sink.emit(&suffixed(&input.name, "-unlocked"), &bytes, PDF_MIME)
        }
        OperationKind::Merge | OperationKind::Extract { .. } => Err(PdfToolError::Operation(
            "Not a per-file operation".into(),
        )),
    }
}

fn load_input(input: &InputFile) -> Result<DocumentHandle, PdfToolError> {
    DocumentHandle::load(&input.name, &input.bytes)
}

/// Check everything that can be checked without opening a file.
fn validate_job(job: &BatchJob) -> Result<(), PdfToolError> {
    let count = job.inputs.len();
    match &job.operation {
        OperationKind::Merge => {
            if count < 2 {
                return Err(PdfToolError::Validation(
                    "Merging requires at least two files".into(),
                ));
            }
        }
        OperationKind::Extract { mode } => {
            if count != 1 {
                return Err(PdfToolError::Validation(
                    "Extraction takes exactly one file".into(),
                ));
            }
            if let ExtractMode::Range { pages } = mode {
                if pages.trim().is_empty() {
                    return Err(PdfToolError::Validation("Page range is required".into()));
                }
            }
        }
        OperationKind::Edit { edit } => {
            require_inputs(count)?;
            match edit {
                EditOperation::Rotate { angle } => {
                    if !matches!(angle, 90 | 180 | 270) {
                        return Err(PdfToolError::Validation(
                            "Rotation angle must be 90, 180 or 270".into(),
                        ));
                    }
                }
                EditOperation::Delete { pages } => {
                    if pages.trim().is_empty() {
                        return Err(PdfToolError::Validation("Page range is required".into()));
                    }
                }
                EditOperation::AddText { text } | EditOperation::Watermark { text } => {
                    if text.is_empty() {
                        return Err(PdfToolError::Validation("Text is required".into()));
                    }
                }
            }
        }
        OperationKind::Compress { .. } | OperationKind::Convert { .. } => {
            require_inputs(count)?;
        }
        OperationKind::Protect {
            password,
            confirm_password,
            ..
        } => {
            require_inputs(count)?;
            if password.is_empty() {
                return Err(PdfToolError::Validation("A password is required".into()));
            }
            if let Some(confirm) = confirm_password {
                if confirm != password {
                    return Err(PdfToolError::Validation("Passwords do not match".into()));
                }
            }
        }
        OperationKind::Unlock { password } => {
            require_inputs(count)?;
            if password.is_empty() {
                return Err(PdfToolError::Validation("A password is required".into()));
            }
        }
    }
    Ok(())
}

fn require_inputs(count: usize) -> Result<(), PdfToolError> {
    if count == 0 {
        return Err(PdfToolError::Validation("No files selected".into()));
    }
    Ok(())
}

/// File name without its final extension.
pub fn stem(name: &str) -> &str {
    name.rsplit_once('.').map(|(base, _)| base).unwrap_or(name)
}

/// Insert a suffix before the final extension: `report.pdf` with
/// `-edited` becomes `report-edited.pdf`.
pub fn suffixed(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((base, ext)) => format!("{}{}.{}", base, suffix, ext),
        None => format!("{}{}", name, suffix),
    }
}

fn extract_output_name(mode: &ExtractMode, index: usize) -> String {
    match mode {
        ExtractMode::Range { .. } => "split-pages.pdf".to_string(),
        ExtractMode::EachPage => format!("page-{}.pdf", index + 1),
        ExtractMode::First => "first-page.pdf".to_string(),
        ExtractMode::Last => "last-page.pdf".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::testdoc::{create_test_pdf, page_texts};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct MemorySink {
        outputs: Vec<(String, Vec<u8>, String)>,
    }

    impl FileSink for MemorySink {
        fn emit(&mut self, name: &str, bytes: &[u8], mime: &str) -> Result<(), PdfToolError> {
            self.outputs
                .push((name.to_string(), bytes.to_vec(), mime.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        states: Vec<ProgressState>,
    }

    impl ProgressObserver for Recorder {
        fn on_progress(&mut self, state: &ProgressState) {
            self.states.push(state.clone());
        }
    }

    fn input(name: &str, pages: u32) -> InputFile {
        InputFile {
            name: name.to_string(),
            bytes: create_test_pdf(pages, stem(name)),
        }
    }

    fn run_job(job: &BatchJob) -> (Result<(), PdfToolError>, MemorySink, Recorder, BatchRunner) {
        let mut runner = BatchRunner::new();
        let mut sink = MemorySink::default();
        let mut recorder = Recorder::default();
        let result = runner.run(job, &mut sink, &mut recorder);
        (result, sink, recorder, runner)
    }

    #[test]
    fn merge_job_emits_one_combined_file() {
        let job = BatchJob {
            operation: OperationKind::Merge,
            inputs: vec![input("a.pdf", 2), input("b.pdf", 3)],
        };
        let (result, sink, recorder, runner) = run_job(&job);
        result.unwrap();

        assert_eq!(runner.status(), BatchStatus::Success);
        assert_eq!(sink.outputs.len(), 1);
        let (name, bytes, mime) = &sink.outputs[0];
        assert_eq!(name, "merged.pdf");
        assert_eq!(mime, PDF_MIME);
        let texts = page_texts(bytes);
        assert_eq!(texts.len(), 5);
        assert!(texts[0].contains("a-Page-1"));
        assert!(texts[2].contains("b-Page-1"));

        let last = recorder.states.last().unwrap();
        assert_eq!(last.status, BatchStatus::Success);
        assert_eq!(last.percent, 100);
    }

    #[test]
    fn merge_with_one_file_fails_before_any_io() {
        let job = BatchJob {
            operation: OperationKind::Merge,
            inputs: vec![input("a.pdf", 2)],
        };
        let (result, sink, recorder, runner) = run_job(&job);
        assert!(matches!(result.unwrap_err(), PdfToolError::Validation(_)));
        assert_eq!(runner.status(), BatchStatus::Error);
        assert!(sink.outputs.is_empty());
        assert_eq!(recorder.states.last().unwrap().status, BatchStatus::Error);
        // A precondition failure must never be observed as processing.
        assert!(recorder
            .states
            .iter()
            .all(|s| s.status != BatchStatus::Processing));
    }

    #[test]
    fn extract_each_page_names_outputs_sequentially() {
        let job = BatchJob {
            operation: OperationKind::Extract {
                mode: ExtractMode::EachPage,
            },
            inputs: vec![input("doc.pdf", 3)],
        };
        let (result, sink, _, _) = run_job(&job);
        result.unwrap();
        let names: Vec<&str> = sink.outputs.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, vec!["page-1.pdf", "page-2.pdf", "page-3.pdf"]);
        assert!(page_texts(&sink.outputs[1].1)[0].contains("doc-Page-2"));
    }

    #[test]
    fn edit_job_suffixes_each_output() {
        let job = BatchJob {
            operation: OperationKind::Edit {
                edit: EditOperation::Rotate { angle: 90 },
            },
            inputs: vec![input("x.pdf", 1), input("y.pdf", 1)],
        };
        let (result, sink, _, _) = run_job(&job);
        result.unwrap();
        assert_eq!(sink.outputs[0].0, "x-edited.pdf");
        assert_eq!(sink.outputs[1].0, "y-edited.pdf");
    }

    #[test]
    fn protect_with_mismatched_confirmation_emits_nothing() {
        let job = BatchJob {
            operation: OperationKind::Protect {
                password: "one".into(),
                confirm_password: Some("two".into()),
                permissions: Permissions::default(),
            },
            inputs: vec![input("doc.pdf", 1)],
        };
        let (result, sink, _, runner) = run_job(&job);
        assert!(matches!(result.unwrap_err(), PdfToolError::Validation(_)));
        assert!(sink.outputs.is_empty());
        assert_eq!(runner.status(), BatchStatus::Error);
    }

    #[test]
    fn protect_then_unlock_round_trips_through_jobs() {
        let job = BatchJob {
            operation: OperationKind::Protect {
                password: "pw".into(),
                confirm_password: Some("pw".into()),
                permissions: Permissions::default(),
            },
            inputs: vec![input("doc.pdf", 2)],
        };
        let (result, sink, _, _) = run_job(&job);
        result.unwrap();
        let (name, locked, _) = &sink.outputs[0];
        assert_eq!(name, "doc-protected.pdf");
        assert!(matches!(
            codec::decode(locked).unwrap_err(),
            PdfToolError::PasswordRequired
        ));

        let job = BatchJob {
            operation: OperationKind::Unlock {
                password: "pw".into(),
            },
            inputs: vec![InputFile {
                name: name.clone(),
                bytes: locked.clone(),
            }],
        };
        let (result, sink, _, _) = run_job(&job);
        result.unwrap();
        assert_eq!(sink.outputs[0].0, "doc-protected-unlocked.pdf");
        assert_eq!(page_texts(&sink.outputs[0].1).len(), 2);
    }

    #[test]
    fn first_failure_aborts_but_keeps_earlier_outputs() {
        let job = BatchJob {
            operation: OperationKind::Compress {
                level: CompressionLevel::Medium,
            },
            inputs: vec![
                input("good.pdf", 1),
                InputFile {
                    name: "bad.pdf".into(),
                    bytes: b"not a pdf".to_vec(),
                },
                input("never.pdf", 1),
            ],
        };
        let (result, sink, _, runner) = run_job(&job);
        assert!(result.is_err());
        assert_eq!(runner.status(), BatchStatus::Error);
        assert_eq!(sink.outputs.len(), 1);
        assert_eq!(sink.outputs[0].0, "good-compressed.pdf");
    }

    #[test]
    fn runner_is_reusable_after_a_terminal_state() {
        let mut runner = BatchRunner::new();
        let mut sink = MemorySink::default();
        let mut recorder = Recorder::default();

        let bad = BatchJob {
            operation: OperationKind::Merge,
            inputs: vec![],
        };
        assert!(runner.run(&bad, &mut sink, &mut recorder).is_err());
        assert_eq!(runner.status(), BatchStatus::Error);

        let good = BatchJob {
            operation: OperationKind::Merge,
            inputs: vec![input("a.pdf", 1), input("b.pdf", 1)],
        };
        runner.run(&good, &mut sink, &mut recorder).unwrap();
        assert_eq!(runner.status(), BatchStatus::Success);
    }

    #[test]
    fn a_running_job_rejects_a_second_run() {
        let mut runner = BatchRunner::new();
        runner.status = BatchStatus::Processing;
        let job = BatchJob {
            operation: OperationKind::Merge,
            inputs: vec![input("a.pdf", 1), input("b.pdf", 1)],
        };
        let err = runner
            .run(&job, &mut MemorySink::default(), &mut Recorder::default())
            .unwrap_err();
        assert!(matches!(err, PdfToolError::Operation(_)));
    }

    #[test]
    fn progress_percent_never_decreases() {
        let job = BatchJob {
            operation: OperationKind::Compress {
                level: CompressionLevel::Low,
            },
            inputs: vec![input("a.pdf", 1), input("b.pdf", 1), input("c.pdf", 1)],
        };
        let (result, _, recorder, _) = run_job(&job);
        result.unwrap();
        let percents: Vec<u8> = recorder.states.iter().map(|s| s.percent).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*percents.last().unwrap(), 100);
    }

    #[test]
    fn operation_kind_deserializes_from_tagged_json() {
        let op: OperationKind = serde_json::from_str(
            r#"{"type":"Edit","edit":{"type":"Watermark","text":"DRAFT"}}"#,
        )
        .unwrap();
        assert!(matches!(
            op,
            OperationKind::Edit {
                edit: EditOperation::Watermark { .. }
            }
        ));

        let op: OperationKind =
            serde_json::from_str(r#"{"type":"Protect","password":"pw"}"#).unwrap();
        match op {
            OperationKind::Protect {
                confirm_password,
                permissions,
                ..
            } => {
                assert!(confirm_password.is_none());
                assert!(permissions.allow_print);
            }
            other => panic!("unexpected operation: {:?}", other),
        }
    }

    #[test]
    fn naming_policy() {
        assert_eq!(stem("report.pdf"), "report");
        assert_eq!(stem("archive.tar.pdf"), "archive.tar");
        assert_eq!(stem("noext"), "noext");
        assert_eq!(suffixed("report.pdf", "-edited"), "report-edited.pdf");
        assert_eq!(suffixed("noext", "-edited"), "noext-edited");
    }
}
