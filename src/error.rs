use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Input directory does not exist: {}", .0.display())]
    InputDirectoryMissing(PathBuf),

    #[error("Failed to prepare output directory: {0}")]
    OutputDirectory(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessFailure(String),

    #[error("Recognition failed: {0}")]
    RecognitionFailure(String),

    #[error("Failed to write output: {0}")]
    WriteFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// Run-level errors abort the whole batch; everything else is scoped to one file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OcrError::InputDirectoryMissing(_)
                | OcrError::OutputDirectory(_)
                | OcrError::InvalidConfig(_)
                | OcrError::InitializationError(_)
        )
    }

    /// The job stage a per-file error belongs to, if any.
    pub fn stage(&self) -> Option<JobStage> {
        match self {
            OcrError::DecodeFailure(_) => Some(JobStage::Decode),
            OcrError::PreprocessFailure(_) => Some(JobStage::Preprocess),
            OcrError::RecognitionFailure(_) => Some(JobStage::Recognize),
            OcrError::WriteFailure(_) => Some(JobStage::Write),
            _ => None,
        }
    }
}

/// Stages of a single file's trip through the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    Decode,
    Preprocess,
    Recognize,
    Write,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Preprocess => "preprocess",
            Self::Recognize => "recognize",
            Self::Write => "write",
        }
    }

    /// Build the per-file error variant matching this stage
    pub fn wrap(self, message: impl Into<String>) -> OcrError {
        let message = message.into();
        match self {
            Self::Decode => OcrError::DecodeFailure(message),
            Self::Preprocess => OcrError::PreprocessFailure(message),
            Self::Recognize => OcrError::RecognitionFailure(message),
            Self::Write => OcrError::WriteFailure(message),
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_level_errors_are_fatal() {
        assert!(OcrError::InputDirectoryMissing(PathBuf::from("/nope")).is_fatal());
        assert!(OcrError::InvalidConfig("workers".into()).is_fatal());
        assert!(!OcrError::DecodeFailure("bad png".into()).is_fatal());
        assert!(!OcrError::WriteFailure("disk full".into()).is_fatal());
    }

    #[test]
    fn test_stage_wrap_round_trips() {
        for stage in [
            JobStage::Decode,
            JobStage::Preprocess,
            JobStage::Recognize,
            JobStage::Write,
        ] {
            assert_eq!(stage.wrap("boom").stage(), Some(stage));
        }
        assert_eq!(OcrError::Internal("x".into()).stage(), None);
    }

    #[test]
    fn test_missing_dir_message_names_path() {
        let err = OcrError::InputDirectoryMissing(PathBuf::from("/data/scans"));
        assert!(err.to_string().contains("/data/scans"));
    }
}
