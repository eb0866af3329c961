use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("No input frames provided")]
    NoInputFrames,

    #[error("Unable to open {}: {reason}", path.display())]
    UnableToOpen {
        path: PathBuf,
        reason: String,
    },

    #[error("Frame {index} is {width}x{height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        index: usize,
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
    },

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Failed to encode output image: {0}")]
    EncodeError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Stacking was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StackError {
    pub fn unable_to_open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StackError::UnableToOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
