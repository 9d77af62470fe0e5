use crate::error::OcrError;
use image::DynamicImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use serde::Serialize;

/// Morphological closing parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MorphologyConfig {
    /// Odd side length of the square structuring element
    pub kernel_size: u32,
    /// Dilations (then erosions) applied; 0 skips the step
    pub iterations: u32,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            iterations: 1,
        }
    }
}

impl MorphologyConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 || self.kernel_size > 511 {
            return Err(OcrError::InvalidConfig(format!(
                "morphology kernel size must be odd and between 1 and 511, got {}",
                self.kernel_size
            )));
        }
        Ok(())
    }

    fn radius(&self) -> u8 {
        (self.kernel_size / 2).min(u8::MAX as u32) as u8
    }
}

/// Dilate then erode with a square element
///
/// Fills gaps narrower than the element inside bright strokes and removes dark
/// specks smaller than it, leaving shapes larger than the element untouched.
/// With binary polarity text is dark, so dark strokes thinner than the element
/// disappear; inverted polarity makes text bright and closing bridges its gaps.
pub fn apply(image: DynamicImage, config: &MorphologyConfig) -> Result<DynamicImage, OcrError> {
    let mut img = image.to_luma8();
    if config.iterations == 0 {
        return Ok(DynamicImage::ImageLuma8(img));
    }

    // L-infinity distance gives a square neighborhood
    let radius = config.radius();
    for _ in 0..config.iterations {
        img = dilate(&img, Norm::LInf, radius);
    }
    for _ in 0..config.iterations {
        img = erode(&img, Norm::LInf, radius);
    }
    Ok(DynamicImage::ImageLuma8(img))
}
