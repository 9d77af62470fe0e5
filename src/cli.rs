use crate::engine::{DEFAULT_ENGINE_MODE, DEFAULT_LANGUAGE, DEFAULT_PAGE_SEG_MODE};
use crate::preprocessing::{DenoiseMethod, ThresholdMethod, DEFAULT_MAX_PIXELS};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "batch-ocr")]
#[command(about = "Extract text from every image in a directory, one .txt per image")]
#[command(version)]
pub struct Args {
    /// Directory containing the images (jpg, jpeg, png, bmp, tiff)
    #[arg(short, long, env = "OCR_INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Directory receiving one <image-stem>.txt per image (created if missing)
    #[arg(short, long, env = "OCR_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Recognition language, `+`-joined for several (e.g. "chi_sim+eng")
    #[arg(short, long, env = "OCR_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Page segmentation mode (6 = single uniform block of text)
    #[arg(long, env = "OCR_PSM", default_value_t = DEFAULT_PAGE_SEG_MODE)]
    pub psm: u8,

    /// Engine mode (3 = best available)
    #[arg(long, env = "OCR_OEM", default_value_t = DEFAULT_ENGINE_MODE)]
    pub oem: u8,

    /// Hand raw decoded images to the recognizer without cleanup
    #[arg(long, env = "OCR_NO_PREPROCESS")]
    pub no_preprocess: bool,

    /// Number of images processed in parallel
    #[arg(short, long, env = "OCR_WORKERS", default_value_t = 4)]
    pub workers: usize,

    /// OCR engine to use (defaults to the first compiled engine)
    #[arg(long, env = "OCR_ENGINE")]
    pub engine: Option<String>,

    /// Path to tessdata directory (downloaded into the cache dir if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Denoising filter: gaussian, median or nlmeans.
    ///
    /// nlmeans preserves edges best but is slow on large scans: tens of
    /// seconds and roughly 16 bytes of scratch memory per pixel, per worker.
    #[arg(long, env = "OCR_DENOISE", default_value = "gaussian")]
    pub denoise: DenoiseMethod,

    /// Skip the denoising step
    #[arg(long, env = "OCR_NO_DENOISE")]
    pub no_denoise: bool,

    /// Non-local means filter strength
    #[arg(long, env = "OCR_DENOISE_STRENGTH", default_value_t = 10.0)]
    pub denoise_strength: f32,

    /// Thresholding policy: otsu (global) or adaptive (local Gaussian)
    #[arg(long, env = "OCR_THRESHOLD", default_value = "otsu")]
    pub threshold: ThresholdMethod,

    /// Invert threshold polarity (pixels above the threshold become black).
    ///
    /// Closing works on the white side of the binary image, so with dark text
    /// (the default) it removes dark specks and strokes thinner than the
    /// element. Pass --invert to make text white and have closing bridge gaps
    /// in strokes instead.
    #[arg(long, env = "OCR_INVERT")]
    pub invert: bool,

    /// Side of the square closing element (odd). Without --invert, dark
    /// strokes narrower than this are erased
    #[arg(long, env = "OCR_MORPH_KERNEL", default_value_t = 3)]
    pub morph_kernel: u32,

    /// Closing iterations (0 disables closing)
    #[arg(long, env = "OCR_MORPH_ITERATIONS", default_value_t = 1)]
    pub morph_iterations: u32,

    /// Sharpen after closing
    #[arg(long, env = "OCR_SHARPEN")]
    pub sharpen: bool,

    /// Reject images with more pixels than this before preprocessing
    #[arg(long, env = "OCR_MAX_PIXELS", default_value_t = DEFAULT_MAX_PIXELS)]
    pub max_pixels: u64,

    /// Log progress every N completed images
    #[arg(long, env = "OCR_PROGRESS_EVERY", default_value_t = 10)]
    pub progress_every: usize,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub summary_json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["batch-ocr", "-i", "scans", "-o", "text"]).unwrap();

        assert_eq!(args.input_dir, PathBuf::from("scans"));
        assert_eq!(args.output_dir, PathBuf::from("text"));
        assert_eq!(args.language, "chi_sim");
        assert_eq!(args.psm, 6);
        assert_eq!(args.oem, 3);
        assert_eq!(args.workers, 4);
        assert!(!args.no_preprocess);
        assert_eq!(args.denoise, DenoiseMethod::Gaussian);
        assert_eq!(args.threshold, ThresholdMethod::Otsu);
    }

    #[test]
    fn test_input_and_output_are_required() {
        assert!(Args::try_parse_from(["batch-ocr", "-i", "scans"]).is_err());
        assert!(Args::try_parse_from(["batch-ocr", "-o", "text"]).is_err());
    }

    #[test]
    fn test_preprocessing_flags() {
        let args = Args::try_parse_from([
            "batch-ocr",
            "--input-dir",
            "a",
            "--output-dir",
            "b",
            "--threshold",
            "adaptive",
            "--denoise",
            "median",
            "--invert",
            "--sharpen",
            "--workers",
            "8",
        ])
        .unwrap();

        assert_eq!(args.threshold, ThresholdMethod::Adaptive);
        assert_eq!(args.denoise, DenoiseMethod::Median);
        assert!(args.invert);
        assert!(args.sharpen);
        assert_eq!(args.workers, 8);
    }

    #[test]
    fn test_unknown_threshold_is_rejected() {
        let parsed = Args::try_parse_from([
            "batch-ocr", "-i", "a", "-o", "b", "--threshold", "sauvola",
        ]);
        assert!(parsed.is_err());
    }
}
