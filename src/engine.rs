use crate::error::OcrError;
use image::DynamicImage;
use serde::Serialize;

/// Tesseract page-segmentation mode: assume a single uniform block of text
pub const DEFAULT_PAGE_SEG_MODE: u8 = 6;

/// Tesseract engine mode: best available engine
pub const DEFAULT_ENGINE_MODE: u8 = 3;

/// Default recognition language (simplified Chinese)
pub const DEFAULT_LANGUAGE: &str = "chi_sim";

/// Settings handed to the recognizer with every image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognitionConfig {
    /// Language code, `+`-joined for multiple packs (e.g. "chi_sim+eng")
    pub language: String,
    /// Page-segmentation mode (0..=13)
    pub page_seg_mode: u8,
    /// Engine mode (0..=3)
    pub engine_mode: u8,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            page_seg_mode: DEFAULT_PAGE_SEG_MODE,
            engine_mode: DEFAULT_ENGINE_MODE,
        }
    }
}

impl RecognitionConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.language.trim().is_empty() {
            return Err(OcrError::InvalidConfig(
                "language cannot be empty (e.g. \"chi_sim\", \"eng\")".to_string(),
            ));
        }
        if self.page_seg_mode > 13 {
            return Err(OcrError::InvalidConfig(format!(
                "page segmentation mode must be 0-13, got {}",
                self.page_seg_mode
            )));
        }
        if self.engine_mode > 3 {
            return Err(OcrError::InvalidConfig(format!(
                "engine mode must be 0-3, got {}",
                self.engine_mode
            )));
        }
        Ok(())
    }

    /// Individual language packs named by `language`
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.language
            .split('+')
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
    }
}

/// Trait that all OCR engines must implement
///
/// Engines are shared across worker threads, so `recognize` takes `&self` and
/// must not hold per-image state between calls.
pub trait Recognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in an already decoded (and possibly preprocessed) image.
    ///
    /// Returns an empty string when no text is found. Engine failures come back
    /// as `OcrError::RecognitionFailure`.
    fn recognize(&self, image: &DynamicImage, config: &RecognitionConfig)
        -> Result<String, OcrError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_chinese_block_mode() {
        let config = RecognitionConfig::default();
        assert_eq!(config.language, "chi_sim");
        assert_eq!(config.page_seg_mode, 6);
        assert_eq!(config.engine_mode, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_modes() {
        let psm = RecognitionConfig {
            page_seg_mode: 14,
            ..Default::default()
        };
        assert!(matches!(psm.validate(), Err(OcrError::InvalidConfig(_))));

        let oem = RecognitionConfig {
            engine_mode: 4,
            ..Default::default()
        };
        assert!(matches!(oem.validate(), Err(OcrError::InvalidConfig(_))));

        let blank = RecognitionConfig {
            language: "  ".to_string(),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_languages_splits_on_plus() {
        let config = RecognitionConfig {
            language: "chi_sim+ eng+".to_string(),
            ..Default::default()
        };
        assert_eq!(config.languages().collect::<Vec<_>>(), vec!["chi_sim", "eng"]);
    }
}
