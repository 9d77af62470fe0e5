//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use. The models only
//! cover Latin script: other languages are refused, and page segmentation
//! settings are ignored.

use crate::config::Config;
use crate::engine::{RecognitionConfig, Recognizer};
use crate::error::OcrError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;
use std::path::PathBuf;

pub const NAME: &str = "ocrs";

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Languages the bundled recognition model can read
const LATIN_LANGUAGES: &[&str] = &["eng", "deu", "fra", "spa", "ita", "por", "nld"];

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Create a new OCR engine, downloading models if needed
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        // Fail before downloading anything
        check_languages(&config.recognition).map_err(OcrError::InitializationError)?;

        let detection_model_path =
            ensure_model_downloaded(DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            OcrError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl Recognizer for OcrsEngine {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies, Latin script only"
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<String, OcrError> {
        check_languages(config).map_err(OcrError::RecognitionFailure)?;

        // ImageSource::from_bytes expects HWC RGB
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            OcrError::RecognitionFailure(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| {
            OcrError::RecognitionFailure(format!("Failed to prepare input: {}", e))
        })?;

        let word_rects = self.engine.detect_words(&ocr_input).map_err(|e| {
            OcrError::RecognitionFailure(format!("Failed to detect words: {}", e))
        })?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| {
                OcrError::RecognitionFailure(format!("Failed to recognize text: {}", e))
            })?;

        Ok(join_lines(line_texts.iter().filter_map(|line| {
            line.as_ref()
                .map(|line| line.words().map(|word| word.to_string()).collect::<Vec<_>>())
        })))
    }

    fn supported_languages(&self) -> Vec<String> {
        LATIN_LANGUAGES.iter().map(|lang| lang.to_string()).collect()
    }
}

/// Every requested language must be one the Latin models can read
fn check_languages(config: &RecognitionConfig) -> Result<(), String> {
    let unsupported: Vec<&str> = config
        .languages()
        .filter(|lang| !LATIN_LANGUAGES.contains(lang))
        .collect();

    if unsupported.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "ocrs cannot read language '{}' (supported: {}); pass --language eng or rebuild with --features engine-tesseract",
            unsupported.join("+"),
            LATIN_LANGUAGES.join(", ")
        ))
    }
}

/// Words joined by spaces, lines by newlines; lines without words are dropped
fn join_lines<I>(lines: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    lines
        .into_iter()
        .filter(|words| !words.is_empty())
        .map(|words| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ensure a model file is cached locally, downloading it on first use
fn ensure_model_downloaded(url: &str, filename: &str) -> Result<PathBuf, OcrError> {
    let model_path = super::cache_dir("models")?.join(filename);

    if model_path.exists() {
        tracing::debug!(path = %model_path.display(), "Using cached model");
        return Ok(model_path);
    }

    tracing::info!(model = filename, "Downloading model (this may take a moment)...");
    super::download_file(url, &model_path)?;
    tracing::info!(path = %model_path.display(), "Downloaded model");

    Ok(model_path)
}
