use crate::engine::{RecognitionConfig, Recognizer};
use crate::error::{JobStage, OcrError};
use crate::preprocessing::Pipeline;
use image::{DynamicImage, ImageReader};
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Read-only state shared by every job in a run
pub struct JobContext {
    /// `None` when preprocessing is disabled
    pub pipeline: Option<Pipeline>,
    pub recognizer: Arc<dyn Recognizer>,
    pub recognition: RecognitionConfig,
}

/// One input image and the text file it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Outcome of a single job
#[derive(Debug)]
pub struct JobResult {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Trimmed recognized text; empty when the job failed
    pub text: String,
    pub error: Option<OcrError>,
    pub elapsed_ms: u64,
}

impl JobResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

impl Job {
    pub fn new(source: PathBuf, output: PathBuf) -> Self {
        Self { source, output }
    }

    /// Run decode, preprocess, recognize and write end to end.
    ///
    /// Never panics and never returns early: every failure, including a panic
    /// inside an engine, ends up in the returned `JobResult`.
    pub fn run(self, ctx: &JobContext) -> JobResult {
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.execute(ctx))).unwrap_or_else(|_| {
            Err(OcrError::Internal(format!(
                "worker panicked while processing {}",
                self.source.display()
            )))
        });
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                tracing::info!(
                    source = %self.source.display(),
                    output = %self.output.display(),
                    chars = text.chars().count(),
                    elapsed_ms,
                    "Extracted text"
                );
                JobResult {
                    source: self.source,
                    output: self.output,
                    text,
                    error: None,
                    elapsed_ms,
                }
            }
            Err(error) => {
                tracing::warn!(
                    path = %self.source.display(),
                    stage = error.stage().map(|s| s.as_str()).unwrap_or("internal"),
                    error = %error,
                    "Failed to process image"
                );
                JobResult {
                    source: self.source,
                    output: self.output,
                    text: String::new(),
                    error: Some(error),
                    elapsed_ms,
                }
            }
        }
    }

    fn execute(&self, ctx: &JobContext) -> Result<String, OcrError> {
        let image = decode(&self.source)?;

        let image = match &ctx.pipeline {
            Some(pipeline) => {
                let result = pipeline.process(image)?;
                tracing::debug!(
                    source = %self.source.display(),
                    time_ms = result.total_time_ms,
                    "Preprocessed image"
                );
                result.image
            }
            None => image,
        };

        let text = ctx
            .recognizer
            .recognize(&image, &ctx.recognition)
            .map_err(|e| match e.stage() {
                Some(_) => e,
                None => JobStage::Recognize.wrap(e.to_string()),
            })?;
        let text = text.trim().to_string();

        write_output(&self.output, &text)?;
        Ok(text)
    }
}

/// Decode by content, so a PNG named `.jpg` still opens; the extension is
/// only the fallback when the header matches no known format
fn decode(path: &Path) -> Result<DynamicImage, OcrError> {
    let fail = |e: &dyn std::fmt::Display| JobStage::Decode.wrap(format!("{}: {}", path.display(), e));

    ImageReader::open(path)
        .map_err(|e| fail(&e))?
        .with_guessed_format()
        .map_err(|e| fail(&e))?
        .decode()
        .map_err(|e| fail(&e))
}

/// Write `text` to `path` atomically, replacing any existing file.
///
/// The text goes to a temporary file in the same directory first, so readers
/// never observe a partially written output.
fn write_output(path: &Path, text: &str) -> Result<(), OcrError> {
    let fail = |e: &dyn std::fmt::Display| JobStage::Write.wrap(format!("{}: {}", path.display(), e));

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail(&e))?;
    file.write_all(text.as_bytes()).map_err(|e| fail(&e))?;
    file.persist(path).map_err(|e| fail(&e.error))?;
    Ok(())
}
