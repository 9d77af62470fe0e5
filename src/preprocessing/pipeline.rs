use crate::error::OcrError;
use image::DynamicImage;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use super::steps;
use super::steps::denoise::DenoiseConfig;
use super::steps::morphology::MorphologyConfig;
use super::steps::threshold::ThresholdConfig;

/// Largest image the pipeline accepts, about a 600 dpi A3 scan
pub const DEFAULT_MAX_PIXELS: u64 = 50_000_000;

/// Knobs for the cleanup pipeline, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessConfig {
    /// `None` skips denoising
    pub denoise: Option<DenoiseConfig>,
    pub threshold: ThresholdConfig,
    pub morphology: MorphologyConfig,
    pub sharpen: bool,
    /// Images with more pixels are rejected before any step runs
    pub max_pixels: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            denoise: Some(DenoiseConfig::default()),
            threshold: ThresholdConfig::default(),
            morphology: MorphologyConfig::default(),
            sharpen: false,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.max_pixels == 0 {
            return Err(OcrError::InvalidConfig(
                "max pixels must be at least 1".to_string(),
            ));
        }
        if let Some(denoise) = &self.denoise {
            denoise.validate()?;
        }
        self.threshold.validate()?;
        self.morphology.validate()
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline: grayscale, denoise, threshold, close, sharpen
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PreprocessConfig,
}

impl Pipeline {
    pub fn new(config: PreprocessConfig) -> Result<Self, OcrError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Clean an image for recognition.
    ///
    /// Each step consumes the previous step's output. A step that cannot run
    /// on the buffer, including one that panics, yields `PreprocessFailure`.
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, OcrError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(OcrError::PreprocessFailure(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.config.max_pixels {
            return Err(OcrError::PreprocessFailure(format!(
                "image is {}x{} ({} pixels), above the limit of {}",
                width, height, pixels, self.config.max_pixels
            )));
        }

        let start = Instant::now();
        let mut steps_timing = Vec::new();
        let config = &self.config;

        let mut img = self.run_step("grayscale", image, &mut steps_timing, steps::grayscale::apply)?;

        if let Some(denoise) = &config.denoise {
            img = self.run_step("denoise", img, &mut steps_timing, |img| {
                steps::denoise::apply(img, denoise)
            })?;
        }

        img = self.run_step("threshold", img, &mut steps_timing, |img| {
            steps::threshold::apply(img, &config.threshold)
        })?;

        img = self.run_step("morphology", img, &mut steps_timing, |img| {
            steps::morphology::apply(img, &config.morphology)
        })?;

        if config.sharpen {
            img = self.run_step("sharpen", img, &mut steps_timing, steps::sharpen::apply)?;
        }

        Ok(PreprocessingResult {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, OcrError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, OcrError>,
    {
        let step_start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| step_fn(img))).map_err(|_| {
            OcrError::PreprocessFailure(format!("{} step panicked", name))
        })??;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!(step = name, time_ms, "preprocessing step finished");
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}
