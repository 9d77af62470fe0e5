//! Tesseract engine implementation
//!
//! Honours language packs, page segmentation mode and engine mode, which makes
//! it the engine of choice for CJK scans. Uses tesseract-static for static
//! linking (no system dependencies) and downloads tessdata on first use unless
//! a tessdata directory is supplied.

use crate::config::Config;
use crate::engine::{RecognitionConfig, Recognizer};
use crate::error::OcrError;
use image::DynamicImage;
use std::path::Path;
use tesseract_static::tesseract::{OcrEngineMode, Tesseract};

pub const NAME: &str = "tesseract";

/// Tesseract OCR Engine
pub struct TesseractEngine {
    /// Path to tessdata directory
    tessdata_path: String,
}

impl TesseractEngine {
    /// Resolve language data and check that Tesseract can start with it
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let recognition = &config.recognition;

        let tessdata_path = match &config.tessdata_path {
            Some(path) => {
                missing_language_packs(Path::new(path), recognition)
                    .map_err(OcrError::InitializationError)?;
                path.clone()
            }
            None => ensure_tessdata_available(recognition)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = create_tesseract(&tessdata_path, recognition)
            .map_err(|e| OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e)))?;
        drop(test_tess);

        tracing::info!(
            tessdata = %tessdata_path,
            language = %recognition.language,
            psm = recognition.page_seg_mode,
            oem = recognition.engine_mode,
            "Tesseract engine initialized"
        );

        Ok(Self { tessdata_path })
    }
}

impl Recognizer for TesseractEngine {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - language packs, page segmentation and engine modes"
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<String, OcrError> {
        // A missing pack makes Tesseract abort instead of returning an error
        missing_language_packs(Path::new(&self.tessdata_path), config)
            .map_err(OcrError::RecognitionFailure)?;

        let (width, height) = (image.width(), image.height());

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        image
            .to_rgb8()
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::RecognitionFailure(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(width, height, bytes = bmp_data.len(), "Handing image to Tesseract");

        let mut tess = create_tesseract(&self.tessdata_path, config)?;

        tess = tess
            .set_variable("tessedit_pageseg_mode", &config.page_seg_mode.to_string())
            .map_err(|e| {
                OcrError::RecognitionFailure(format!(
                    "Failed to set page segmentation mode {}: {}",
                    config.page_seg_mode, e
                ))
            })?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::RecognitionFailure(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| OcrError::RecognitionFailure(format!("Failed to recognize text: {}", e)))?;

        tess.get_text()
            .map_err(|e| OcrError::RecognitionFailure(format!("Failed to get text: {}", e)))
    }

    fn supported_languages(&self) -> Vec<String> {
        // Whatever packs are installed in the tessdata directory
        let mut languages: Vec<String> = std::fs::read_dir(&self.tessdata_path)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        let name = entry.file_name().to_string_lossy().to_string();
                        name.strip_suffix(".traineddata").map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default();
        languages.sort();
        languages
    }
}

fn create_tesseract(tessdata_path: &str, config: &RecognitionConfig) -> Result<Tesseract, OcrError> {
    Tesseract::new_with_oem(
        Some(tessdata_path),
        Some(&config.language),
        engine_mode(config.engine_mode),
    )
    .map_err(|e| {
        OcrError::RecognitionFailure(format!(
            "Failed to create Tesseract for '{}': {}",
            config.language, e
        ))
    })
}

fn engine_mode(mode: u8) -> OcrEngineMode {
    match mode {
        0 => OcrEngineMode::TesseractOnly,
        1 => OcrEngineMode::LstmOnly,
        2 => OcrEngineMode::TesseractLstmCombined,
        _ => OcrEngineMode::Default,
    }
}

/// Every `+`-joined language needs a `<lang>.traineddata` in the tessdata dir
fn missing_language_packs(tessdata: &Path, config: &RecognitionConfig) -> Result<(), String> {
    let missing: Vec<&str> = config
        .languages()
        .filter(|lang| !tessdata.join(format!("{}.traineddata", lang)).exists())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Language data not found in {}: {}",
            tessdata.display(),
            missing.join(", ")
        ))
    }
}

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(config: &RecognitionConfig) -> Result<String, OcrError> {
    let cache_dir = super::cache_dir("tessdata")?;

    for language in config.languages() {
        let traineddata_path = cache_dir.join(format!("{}.traineddata", language));
        if traineddata_path.exists() {
            tracing::debug!(language, "Using cached tessdata");
            continue;
        }

        tracing::info!(language, "Downloading tessdata (this may take a moment)...");
        super::download_file(&tessdata_url(language), &traineddata_path)?;
        tracing::info!(path = %traineddata_path.display(), "Downloaded tessdata");
    }

    // Tesseract expects the directory, not the file
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // tessdata_fast: smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
