use crate::error::OcrError;
use image::DynamicImage;
use imageproc::filter::filter3x3;

/// High-pass sharpening kernel: center 9, all eight neighbors -1
const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Restore edge contrast lost to denoising
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    let gray = image.to_luma8();
    let sharpened = filter3x3(&gray, &SHARPEN_KERNEL);
    Ok(DynamicImage::ImageLuma8(sharpened))
}
