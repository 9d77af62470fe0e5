use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use serde::Serialize;
use std::str::FromStr;

/// Sigma of the conventional 3x3 Gaussian kernel
const GAUSSIAN_SIGMA: f32 = 0.8;

/// Noise suppression filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoiseMethod {
    /// Patch-similarity weighted averaging over a search window.
    ///
    /// Keeps edges better than a blur but costs one pass per search offset
    /// (441 for a 21px window) and about 16 bytes of scratch per pixel.
    NonLocalMeans,
    /// Light Gaussian blur (sigma 0.8)
    #[default]
    Gaussian,
    /// 3x3 median filter, good for salt-and-pepper noise
    Median,
}

impl DenoiseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonLocalMeans => "nlmeans",
            Self::Gaussian => "gaussian",
            Self::Median => "median",
        }
    }
}

impl FromStr for DenoiseMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nlmeans" | "non-local-means" => Ok(Self::NonLocalMeans),
            "gaussian" => Ok(Self::Gaussian),
            "median" => Ok(Self::Median),
            other => Err(format!(
                "unknown denoise method '{}' (expected nlmeans, gaussian or median)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenoiseConfig {
    pub method: DenoiseMethod,
    /// Filter strength `h` for non-local means; larger removes more noise
    pub strength: f32,
    /// Side of the square patch compared between pixels
    pub template_window: u32,
    /// Side of the square area searched for similar patches
    pub search_window: u32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            method: DenoiseMethod::default(),
            strength: 10.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

impl DenoiseConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.strength.is_nan() || self.strength <= 0.0 {
            return Err(OcrError::InvalidConfig(format!(
                "denoise strength must be positive, got {}",
                self.strength
            )));
        }
        if self.template_window == 0 || self.search_window < self.template_window {
            return Err(OcrError::InvalidConfig(format!(
                "denoise windows must satisfy 0 < template ({}) <= search ({})",
                self.template_window, self.search_window
            )));
        }
        Ok(())
    }
}

/// Suppress high-frequency pixel noise
pub fn apply(image: DynamicImage, config: &DenoiseConfig) -> Result<DynamicImage, OcrError> {
    let gray = image.to_luma8();
    let denoised = match config.method {
        DenoiseMethod::NonLocalMeans => non_local_means(
            &gray,
            config.strength,
            config.template_window / 2,
            config.search_window / 2,
        ),
        DenoiseMethod::Gaussian => gaussian_blur_f32(&gray, GAUSSIAN_SIGMA),
        DenoiseMethod::Median => median_filter(&gray, 1, 1),
    };
    Ok(DynamicImage::ImageLuma8(denoised))
}

/// Non-local means denoising
///
/// Every pixel becomes a weighted average of the pixels in its search window,
/// weighted by `exp(-d / h^2)` where `d` is the mean squared difference between
/// the two surrounding template patches. Patch distances for one offset are read
/// from an integral image of squared differences, so each offset costs two
/// passes over the image regardless of template size. Borders are replicated.
fn non_local_means(img: &GrayImage, h: f32, template_radius: u32, search_radius: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    let (w, ht) = (width as usize, height as usize);
    if w == 0 || ht == 0 {
        return img.clone();
    }

    let src = img.as_raw();
    let tr = template_radius as usize;
    let sr = search_radius as i64;
    let h2 = h * h;
    let stride = w + 1;

    let mut weight_sum = vec![0f32; w * ht];
    let mut value_sum = vec![0f32; w * ht];
    let mut integral = vec![0u64; stride * (ht + 1)];

    for dy in -sr..=sr {
        for dx in -sr..=sr {
            for y in 0..ht {
                let sy = clamp_index(y as i64 + dy, ht);
                let mut row_sum = 0u64;
                for x in 0..w {
                    let sx = clamp_index(x as i64 + dx, w);
                    let diff = src[y * w + x] as i64 - src[sy * w + sx] as i64;
                    row_sum += (diff * diff) as u64;
                    integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
                }
            }

            for y in 0..ht {
                let y1 = y.saturating_sub(tr);
                let y2 = (y + tr + 1).min(ht);
                let sy = clamp_index(y as i64 + dy, ht);
                for x in 0..w {
                    let x1 = x.saturating_sub(tr);
                    let x2 = (x + tr + 1).min(w);
                    let area = ((x2 - x1) * (y2 - y1)) as f32;
                    let ssd = integral[y2 * stride + x2] + integral[y1 * stride + x1]
                        - integral[y1 * stride + x2]
                        - integral[y2 * stride + x1];

                    let weight = (-(ssd as f32 / area) / h2).exp();
                    let sx = clamp_index(x as i64 + dx, w);
                    let idx = y * w + x;
                    weight_sum[idx] += weight;
                    value_sum[idx] += weight * src[sy * w + sx] as f32;
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let idx = y as usize * w + x as usize;
        // The zero offset always contributes weight 1, so the sum is never zero
        let value = value_sum[idx] / weight_sum[idx];
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

fn clamp_index(value: i64, len: usize) -> usize {
    value.clamp(0, len as i64 - 1) as usize
}
