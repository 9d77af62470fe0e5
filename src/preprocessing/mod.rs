//! Image preprocessing module for OCR enhancement
//!
//! Conditions a decoded scan for the recognizer: grayscale, denoise,
//! binarize, morphological closing and an optional sharpen.

pub mod pipeline;
pub mod steps;

pub use pipeline::{
    Pipeline, PreprocessConfig, PreprocessingResult, StepTiming, DEFAULT_MAX_PIXELS,
};
pub use steps::denoise::{DenoiseConfig, DenoiseMethod};
pub use steps::morphology::MorphologyConfig;
pub use steps::threshold::{Polarity, ThresholdConfig, ThresholdMethod};
