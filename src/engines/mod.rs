//! OCR engine implementations
//!
//! This module contains implementations of the Recognizer trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

use crate::config::Config;
use crate::engine::Recognizer;
use crate::error::OcrError;
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound for a downloaded model or language pack
#[allow(dead_code)]
const MAX_DOWNLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Names of the engines compiled into this build, in order of preference.
///
/// Tesseract comes first because it honours language, page segmentation and
/// engine mode; ocrs is a Latin-only pure Rust fallback.
pub fn available_engines() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut names = Vec::new();
    #[cfg(feature = "engine-tesseract")]
    names.push(tesseract::NAME);
    #[cfg(feature = "engine-ocrs")]
    names.push(ocrs::NAME);
    names
}

/// Initialize the engine named in the config, or the preferred compiled one
pub fn create_engine(config: &Config) -> Result<Arc<dyn Recognizer>, OcrError> {
    let available = available_engines();
    let name = match config.engine.as_deref() {
        Some(name) => name,
        None => available.first().copied().ok_or_else(|| {
            OcrError::InitializationError(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-tesseract"
                    .to_string(),
            )
        })?,
    };

    tracing::info!(engine = name, "Initializing OCR engine...");
    match name {
        #[cfg(feature = "engine-tesseract")]
        tesseract::NAME => Ok(Arc::new(tesseract::TesseractEngine::new(config)?)),
        #[cfg(feature = "engine-ocrs")]
        ocrs::NAME => Ok(Arc::new(ocrs::OcrsEngine::new(config)?)),
        other => Err(OcrError::InvalidConfig(format!(
            "engine '{}' is not available in this build (compiled: {})",
            other,
            if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            }
        ))),
    }
}

/// Per-user cache directory for downloaded models and language data
#[allow(dead_code)]
pub(crate) fn cache_dir(kind: &str) -> Result<PathBuf, OcrError> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("batch-ocr")
        .join(kind);

    std::fs::create_dir_all(&dir).map_err(|e| {
        OcrError::InitializationError(format!(
            "Failed to create cache directory {}: {}",
            dir.display(),
            e
        ))
    })?;
    Ok(dir)
}

/// Download a file from URL to path using ureq
///
/// The body lands in a temporary file next to `path` and is renamed into place,
/// so an interrupted download never leaves a truncated model behind.
#[allow(dead_code)]
pub(crate) fn download_file(url: &str, path: &std::path::Path) -> Result<(), OcrError> {
    use std::io::Write;

    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response
        .into_body()
        .with_config()
        .limit(MAX_DOWNLOAD_BYTES)
        .read_to_vec()
        .map_err(|e| {
            OcrError::InitializationError(format!("Failed to read response from {}: {}", url, e))
        })?;

    let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create temporary file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        OcrError::InitializationError(format!("Failed to write {}: {}", path.display(), e))
    })?;
    file.persist(path).map_err(|e| {
        OcrError::InitializationError(format!("Failed to store {}: {}", path.display(), e))
    })?;

    Ok(())
}
