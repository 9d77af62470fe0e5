use crate::cli::Args;
use crate::engine::RecognitionConfig;
use crate::error::OcrError;
use crate::preprocessing::{
    DenoiseConfig, MorphologyConfig, Polarity, PreprocessConfig, ThresholdConfig,
};
use std::path::PathBuf;

/// Batch run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Size of the worker pool
    pub workers: usize,
    /// `None` hands decoded images straight to the recognizer
    pub preprocess: Option<PreprocessConfig>,
    pub recognition: RecognitionConfig,
    /// Engine name; `None` picks the first compiled engine
    pub engine: Option<String>,
    pub tessdata_path: Option<String>,
    /// Log progress every N completed jobs
    pub progress_every: usize,
}

impl Config {
    /// Defaults for everything except the two directories
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            workers: 4,
            preprocess: Some(PreprocessConfig::default()),
            recognition: RecognitionConfig::default(),
            engine: None,
            tessdata_path: None,
            progress_every: 10,
        }
    }

    pub fn validate(&self) -> Result<(), OcrError> {
        if self.workers == 0 {
            return Err(OcrError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if let Some(preprocess) = &self.preprocess {
            preprocess.validate()?;
        }
        self.recognition.validate()
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let preprocess = (!args.no_preprocess).then(|| PreprocessConfig {
            denoise: (!args.no_denoise).then(|| DenoiseConfig {
                method: args.denoise,
                strength: args.denoise_strength,
                ..Default::default()
            }),
            threshold: ThresholdConfig {
                method: args.threshold,
                polarity: if args.invert {
                    Polarity::Inverted
                } else {
                    Polarity::Binary
                },
                ..Default::default()
            },
            morphology: MorphologyConfig {
                kernel_size: args.morph_kernel,
                iterations: args.morph_iterations,
            },
            sharpen: args.sharpen,
            max_pixels: args.max_pixels,
        });

        Self {
            input_dir: args.input_dir,
            output_dir: args.output_dir,
            workers: args.workers,
            preprocess,
            recognition: RecognitionConfig {
                language: args.language,
                page_seg_mode: args.psm,
                engine_mode: args.oem,
            },
            engine: args.engine,
            tessdata_path: args.tessdata_path,
            progress_every: args.progress_every.max(1),
        }
    }
}
