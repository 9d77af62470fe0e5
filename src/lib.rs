//! Batch OCR for directories of scanned images.
//!
//! Each image is decoded, cleaned up by the [`preprocessing`] pipeline and
//! handed to a [`engine::Recognizer`]; the recognized text lands in
//! `<output-dir>/<image-stem>.txt`. The [`batch`] module fans this out over a
//! bounded worker pool and isolates per-image failures.

pub mod batch;
pub mod cli;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod preprocessing;

pub use batch::{run_batch, BatchPlan, Orchestrator, RunSummary, ShutdownSignal};
pub use config::Config;
pub use engine::{RecognitionConfig, Recognizer};
pub use error::{JobStage, OcrError};
pub use preprocessing::{Pipeline, PreprocessConfig};
