//! Individual preprocessing steps

pub mod denoise;
pub mod grayscale;
pub mod morphology;
pub mod sharpen;
pub mod threshold;
