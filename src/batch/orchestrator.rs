use super::discovery::{assign_output_paths, discover_images, ensure_output_dir, output_collisions};
use super::job::{Job, JobContext, JobResult};
use super::progress::RunStats;
use crate::config::Config;
use crate::engine::{RecognitionConfig, Recognizer};
use crate::error::{JobStage, OcrError};
use crate::preprocessing::Pipeline;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Cooperative stop flag: once triggered no new jobs are scheduled, while jobs
/// already running finish and keep their outputs.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Validated directories plus the images found in the input directory
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Sorted candidate images
    pub files: Vec<PathBuf>,
    /// Text file for each entry of `files`, all distinct
    pub outputs: Vec<PathBuf>,
}

impl BatchPlan {
    /// Validate the input directory, create the output directory, list images.
    ///
    /// The output directory is only created once the input directory is known
    /// to exist.
    pub fn prepare(input_dir: &Path, output_dir: &Path) -> Result<Self, OcrError> {
        if !input_dir.is_dir() {
            return Err(OcrError::InputDirectoryMissing(input_dir.to_path_buf()));
        }
        ensure_output_dir(output_dir)?;
        let files = discover_images(input_dir)?;

        for (output, sources) in output_collisions(&files, output_dir) {
            tracing::warn!(
                output = %output.display(),
                sources = ?sources,
                "Several images share a stem; their outputs keep the image extension"
            );
        }
        let outputs = assign_output_paths(&files, output_dir);

        Ok(Self {
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            files,
            outputs,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    fn jobs(&self) -> Vec<Job> {
        self.files
            .iter()
            .zip(&self.outputs)
            .map(|(source, output)| Job::new(source.clone(), output.clone()))
            .collect()
    }
}

/// A failed image as reported in the summary
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub source: PathBuf,
    pub stage: Option<JobStage>,
    pub error: String,
}

/// What a run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Candidate images found
    pub found: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Images never scheduled because a shutdown was requested
    pub skipped: usize,
    pub elapsed_ms: u64,
    /// Sorted by source path
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    fn from_results(found: usize, skipped: usize, results: Vec<JobResult>, lost: usize, started: Instant) -> Self {
        let succeeded = results.iter().filter(|r| r.succeeded()).count();
        let mut failures: Vec<FailureRecord> = results
            .into_iter()
            .filter_map(|result| {
                result.error.map(|error| FailureRecord {
                    source: result.source,
                    stage: error.stage(),
                    error: error.to_string(),
                })
            })
            .collect();
        failures.sort_by(|a, b| a.source.cmp(&b.source));

        Self {
            found,
            succeeded,
            failed: failures.len() + lost,
            skipped,
            elapsed_ms: started.elapsed().as_millis() as u64,
            failures,
        }
    }
}

/// Runs the per-image pipeline for a batch on a bounded worker pool
pub struct Orchestrator {
    workers: usize,
    progress_every: usize,
    context: Arc<JobContext>,
    shutdown: ShutdownSignal,
}

impl Orchestrator {
    /// Validates `config` and builds the preprocessing pipeline once for the run
    pub fn new(config: &Config, recognizer: Arc<dyn Recognizer>) -> Result<Self, OcrError> {
        config.validate()?;
        let pipeline = config.preprocess.clone().map(Pipeline::new).transpose()?;

        Ok(Self {
            workers: config.workers,
            progress_every: config.progress_every,
            context: Arc::new(JobContext {
                pipeline,
                recognizer,
                recognition: config.recognition.clone(),
            }),
            shutdown: ShutdownSignal::new(),
        })
    }

    /// Use an externally owned stop flag (e.g. one wired to Ctrl-C)
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn recognition(&self) -> &RecognitionConfig {
        &self.context.recognition
    }

    /// Prepare and execute a batch. Only directory-level problems are errors.
    pub async fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<RunSummary, OcrError> {
        let plan = BatchPlan::prepare(input_dir, output_dir)?;
        Ok(self.execute(plan).await)
    }

    /// Process every image in the plan. Per-image failures are counted in the
    /// summary and never abort sibling jobs.
    pub async fn execute(&self, plan: BatchPlan) -> RunSummary {
        let started = Instant::now();
        let found = plan.len();

        if plan.is_empty() {
            tracing::warn!(
                dir = %plan.input_dir.display(),
                extensions = ?super::SUPPORTED_EXTENSIONS,
                "No matching image files found"
            );
            return RunSummary::default();
        }

        tracing::info!(
            found,
            workers = self.workers,
            engine = self.context.recognizer.name(),
            preprocess = self.context.pipeline.is_some(),
            "Starting batch"
        );

        let stats = Arc::new(RunStats::new(found, self.progress_every));
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut skipped = 0;

        for (index, job) in plan.jobs().into_iter().enumerate() {
            if self.shutdown.is_triggered() {
                skipped = found - index;
                break;
            }

            // Wait for a free worker before scheduling the next image
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, "Worker pool closed unexpectedly");
                    skipped = found - index;
                    break;
                }
            };

            if self.shutdown.is_triggered() {
                skipped = found - index;
                break;
            }

            let context = Arc::clone(&self.context);
            let stats = Arc::clone(&stats);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = job.run(&context);
                stats.record(result.succeeded());
                result
            });
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Shutdown requested; remaining images were not scheduled");
        }

        let mut results = Vec::with_capacity(found);
        let mut lost = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(error = %e, "Worker task did not complete");
                    lost += 1;
                }
            }
        }

        let summary = RunSummary::from_results(found, skipped, results, lost, started);
        tracing::info!(
            found = summary.found,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed_ms,
            rate = format_args!("{:.2} jobs/sec", stats.throughput()),
            "Batch complete"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};
    use std::fs;

    struct EchoRecognizer;

    impl Recognizer for EchoRecognizer {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "reports image width"
        }

        fn recognize(&self, image: &DynamicImage, _: &RecognitionConfig) -> Result<String, OcrError> {
            Ok(format!("width {}", image.width()))
        }

        fn supported_languages(&self) -> Vec<String> {
            vec![]
        }
    }

    fn orchestrator(workers: usize) -> Orchestrator {
        let mut config = Config::new("unused", "unused");
        config.workers = workers;
        config.preprocess = None;
        Orchestrator::new(&config, Arc::new(EchoRecognizer)).unwrap()
    }

    fn write_images(dir: &Path, count: u32) {
        for i in 0..count {
            GrayImage::from_pixel(10 + i, 5, Luma([128]))
                .save(dir.join(format!("img_{:02}.png", i)))
                .unwrap();
        }
    }

    #[test]
    fn test_shutdown_signal_is_shared_between_clones() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_triggered());
        signal.trigger();
        assert!(clone.is_triggered());
    }

    #[test]
    fn test_prepare_missing_input_does_not_create_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");

        let err = BatchPlan::prepare(&dir.path().join("missing"), &output).unwrap_err();

        assert!(matches!(err, OcrError::InputDirectoryMissing(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::new("in", "out");
        config.workers = 0;
        assert!(matches!(
            Orchestrator::new(&config, Arc::new(EchoRecognizer)),
            Err(OcrError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_run_processes_every_image() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_images(input.path(), 5);

        let summary = orchestrator(2).run(input.path(), output.path()).await.unwrap();

        assert_eq!(summary.found, 5);
        assert_eq!(summary.succeeded, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            fs::read_to_string(output.path().join("img_03.txt")).unwrap(),
            "width 13"
        );
    }

    #[tokio::test]
    async fn test_triggered_shutdown_schedules_nothing() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_images(input.path(), 3);

        let orchestrator = orchestrator(1);
        orchestrator.shutdown_signal().trigger();
        let summary = orchestrator.run(input.path(), output.path()).await.unwrap();

        assert_eq!(summary.found, 3);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_plan_returns_empty_summary() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("readme.md"), "not an image").unwrap();

        let summary = orchestrator(4).run(input.path(), output.path()).await.unwrap();

        assert_eq!(summary.found, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
    }
}
