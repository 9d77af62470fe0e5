//! Batch orchestration
//!
//! Finds the images in an input directory, runs decode, preprocess, recognize
//! and write for each one on a bounded worker pool, and reports what happened.
//! A failing image only fails its own job.

pub mod discovery;
pub mod job;
pub mod orchestrator;
pub mod progress;

pub use discovery::{
    assign_output_paths, discover_images, is_supported_image, output_path_for, SUPPORTED_EXTENSIONS,
};
pub use job::{Job, JobContext, JobResult};
pub use orchestrator::{BatchPlan, FailureRecord, Orchestrator, RunSummary, ShutdownSignal};
pub use progress::RunStats;

use crate::config::Config;
use crate::engine::Recognizer;
use crate::error::OcrError;
use std::sync::Arc;

/// Plan and execute a whole batch described by `config`
pub async fn run_batch(
    config: &Config,
    recognizer: Arc<dyn Recognizer>,
) -> Result<RunSummary, OcrError> {
    let orchestrator = Orchestrator::new(config, recognizer)?;
    orchestrator.run(&config.input_dir, &config.output_dir).await
}
