use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};

/// Collapse color channels to single-channel luminance
///
/// Transparent pixels are flattened onto white first so that PNG scans with
/// an alpha channel keep a light page instead of turning black.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    if !image.color().has_alpha() {
        return Ok(DynamicImage::ImageLuma8(image.to_luma8()));
    }

    let rgba = image.to_luma_alpha8();
    let flattened = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [luma, alpha] = rgba.get_pixel(x, y).0;
        let alpha = alpha as u32;
        let value = (luma as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
        Luma([value as u8])
    });
    Ok(DynamicImage::ImageLuma8(flattened))
}
