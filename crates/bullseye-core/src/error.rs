use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BullseyeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Invalid frame source: {0}")]
    InvalidSource(String),

    #[error("{field} = {value} outside [{min}, {max}]")]
    Configuration {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    #[error("A capture worker is already running")]
    WorkerAlreadyRunning,

    #[error("Capture worker did not terminate within {timeout:?}")]
    StopTimeout { timeout: Duration },

    #[error("Capture worker panicked")]
    WorkerPanicked,
}

impl BullseyeError {
    /// Build a `Configuration` error for a value outside `[min, max]`.
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::Configuration {
            field,
            value,
            min,
            max,
        }
    }
}

pub type Result<T> = std::result::Result<T, BullseyeError>;
