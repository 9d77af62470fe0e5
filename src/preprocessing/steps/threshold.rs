use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use serde::Serialize;
use std::str::FromStr;

/// Neighborhood size for adaptive thresholding
pub const DEFAULT_BLOCK_SIZE: u32 = 11;

/// Constant subtracted from the local weighted mean
pub const DEFAULT_OFFSET: f32 = 2.0;

/// How the binarization threshold is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// One global threshold minimizing intra-class variance
    #[default]
    Otsu,
    /// Per-pixel threshold from a Gaussian-weighted neighborhood mean.
    /// Preferred when illumination is uneven across the page.
    Adaptive,
}

impl FromStr for ThresholdMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "otsu" => Ok(Self::Otsu),
            "adaptive" | "adaptive-gaussian" => Ok(Self::Adaptive),
            other => Err(format!(
                "unknown threshold method '{}' (expected otsu or adaptive)",
                other
            )),
        }
    }
}

/// Which side of the threshold becomes white
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Pixels brighter than the threshold become 255
    #[default]
    Binary,
    /// Pixels brighter than the threshold become 0
    Inverted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdConfig {
    pub method: ThresholdMethod,
    pub polarity: Polarity,
    /// Odd side length of the adaptive neighborhood
    pub block_size: u32,
    /// Subtracted from the adaptive local mean
    pub offset: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            method: ThresholdMethod::Otsu,
            polarity: Polarity::Binary,
            block_size: DEFAULT_BLOCK_SIZE,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.method == ThresholdMethod::Adaptive
            && (self.block_size < 3 || self.block_size % 2 == 0)
        {
            return Err(OcrError::InvalidConfig(format!(
                "adaptive block size must be odd and >= 3, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}

/// Binarize to pure foreground/background (every output pixel is 0 or 255)
pub fn apply(image: DynamicImage, config: &ThresholdConfig) -> Result<DynamicImage, OcrError> {
    let gray = image.to_luma8();
    let binarized = match config.method {
        ThresholdMethod::Otsu => {
            let level = otsu_level(&gray);
            tracing::trace!(level, "otsu threshold");
            binarize(&gray, config.polarity, |_, _| level as f32)
        }
        ThresholdMethod::Adaptive => {
            let means = gaussian_local_mean(&gray, config.block_size);
            let width = gray.width() as usize;
            binarize(&gray, config.polarity, |x, y| {
                means[y as usize * width + x as usize] - config.offset
            })
        }
    };
    Ok(DynamicImage::ImageLuma8(binarized))
}

fn binarize<F>(img: &GrayImage, polarity: Polarity, threshold_at: F) -> GrayImage
where
    F: Fn(u32, u32) -> f32,
{
    let (on, off) = match polarity {
        Polarity::Binary => (255u8, 0u8),
        Polarity::Inverted => (0u8, 255u8),
    };
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let pixel = img.get_pixel(x, y).0[0] as f32;
        if pixel > threshold_at(x, y) {
            Luma([on])
        } else {
            Luma([off])
        }
    })
}

/// Gaussian-weighted mean of each pixel's `block_size` x `block_size` neighborhood
///
/// The kernel is separable, so rows and columns are filtered independently.
/// Borders are replicated.
fn gaussian_local_mean(img: &GrayImage, block_size: u32) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let (w, h) = (width as usize, height as usize);
    let kernel = gaussian_kernel(block_size);
    let radius = (kernel.len() / 2) as i64;
    let src = img.as_raw();

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as i64 + k as i64 - radius).clamp(0, w as i64 - 1) as usize;
                acc += weight * src[y * w + sx] as f32;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut means = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as i64 + k as i64 - radius).clamp(0, h as i64 - 1) as usize;
                acc += weight * horizontal[sy * w + x];
            }
            means[y * w + x] = acc;
        }
    }
    means
}

/// Normalized 1-D Gaussian with the conventional sigma for a given aperture
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let raw: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bright page with a dark square "blob" of ink
    fn blob_fixture() -> GrayImage {
        GrayImage::from_fn(60, 60, |x, y| {
            if (20..40).contains(&x) && (20..40).contains(&y) {
                Luma([25])
            } else {
                Luma([230])
            }
        })
    }

    /// Paper brightness ramps from 60 on the left to 250 on the right, with
    /// 3px-wide vertical strokes 50 levels darker than the local paper.
    fn lighting_gradient_fixture() -> (GrayImage, impl Fn(u32) -> bool) {
        let is_stroke = |x: u32| (8..11).contains(&(x % 20));
        let img = GrayImage::from_fn(200, 30, |x, _| {
            let paper = 60 + x * 190 / 199;
            if is_stroke(x) {
                Luma([(paper - 50) as u8])
            } else {
                Luma([paper as u8])
            }
        });
        (img, is_stroke)
    }

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        for method in [ThresholdMethod::Otsu, ThresholdMethod::Adaptive] {
            let config = ThresholdConfig {
                method,
                ..Default::default()
            };
            let result = apply(DynamicImage::ImageLuma8(img.clone()), &config).unwrap();
            for pixel in result.to_luma8().pixels() {
                assert!(
                    pixel.0[0] == 0 || pixel.0[0] == 255,
                    "Expected binary pixel, got {}",
                    pixel.0[0]
                );
            }
        }
    }

    #[test]
    fn test_otsu_recovers_dark_blob() {
        let img = blob_fixture();
        let result = apply(
            DynamicImage::ImageLuma8(img.clone()),
            &ThresholdConfig::default(),
        )
        .unwrap()
        .to_luma8();

        let mismatched = img
            .enumerate_pixels()
            .filter(|(x, y, p)| {
                let ink = p.0[0] < 128;
                let black = result.get_pixel(*x, *y).0[0] == 0;
                ink != black
            })
            .count();
        assert_eq!(mismatched, 0);
    }

    #[test]
    fn test_inverted_polarity_flips_output() {
        let img = blob_fixture();
        let config = ThresholdConfig {
            polarity: Polarity::Inverted,
            ..Default::default()
        };
        let result = apply(DynamicImage::ImageLuma8(img), &config)
            .unwrap()
            .to_luma8();

        assert_eq!(result.get_pixel(30, 30).0[0], 255);
        assert_eq!(result.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn test_adaptive_handles_lighting_gradient() {
        let (img, is_stroke) = lighting_gradient_fixture();
        let config = ThresholdConfig {
            method: ThresholdMethod::Adaptive,
            ..Default::default()
        };
        let result = apply(DynamicImage::ImageLuma8(img.clone()), &config)
            .unwrap()
            .to_luma8();

        let total = (img.width() * img.height()) as usize;
        let mismatched = result
            .enumerate_pixels()
            .filter(|(x, _, p)| (p.0[0] == 0) != is_stroke(*x))
            .count();
        assert!(
            mismatched * 100 <= total,
            "adaptive threshold misclassified {} of {} pixels",
            mismatched,
            total
        );
    }

    #[test]
    fn test_global_otsu_fails_on_lighting_gradient() {
        let (img, is_stroke) = lighting_gradient_fixture();
        let result = apply(DynamicImage::ImageLuma8(img), &ThresholdConfig::default())
            .unwrap()
            .to_luma8();

        // Dim paper on the left falls below the single global threshold
        assert!(!is_stroke(0));
        assert_eq!(result.get_pixel(0, 15).0[0], 0);
    }

    #[test]
    fn test_gaussian_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(11);
        assert_eq!(kernel.len(), 11);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[10]).abs() < 1e-6);
        assert!(kernel[5] > kernel[4]);
    }

    #[test]
    fn test_validate_rejects_even_block() {
        let config = ThresholdConfig {
            method: ThresholdMethod::Adaptive,
            block_size: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // Block size only matters for adaptive thresholding
        let otsu = ThresholdConfig {
            block_size: 10,
            ..Default::default()
        };
        assert!(otsu.validate().is_ok());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("OTSU".parse::<ThresholdMethod>(), Ok(ThresholdMethod::Otsu));
        assert_eq!("adaptive".parse::<ThresholdMethod>(), Ok(ThresholdMethod::Adaptive));
        assert!("sauvola".parse::<ThresholdMethod>().is_err());
    }
}
