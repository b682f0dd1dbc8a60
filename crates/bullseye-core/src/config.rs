use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CROP_ITERATIONS, DEFAULT_CROP_RADIUS, DEFAULT_EXPOSURE_ADJUSTMENT,
    DEFAULT_EXPOSURE_HIGH, DEFAULT_EXPOSURE_LOW, DEFAULT_EXPOSURE_MAX_ITERATIONS,
    DEFAULT_EXPOSURE_PERCENTILE, DEFAULT_IGNORE_FRACTION, MAX_AVERAGE_WINDOW,
    MAX_IGNORE_FRACTION,
};
use crate::error::{BullseyeError, Result};
use crate::frame::Roi;

/// Complete engine configuration, loadable from TOML.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BullseyeConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub exposure: AutoExposureConfig,
}

impl BullseyeConfig {
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            capture: self.capture.validated()?,
            process: self.process.validated()?,
            exposure: self.exposure.validated()?,
        })
    }
}

/// Initial capture settings. Unset exposure fields keep the device's values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Exposure time per frame in seconds.
    pub shutter: Option<f64>,
    /// Analog gain in dB.
    pub gain: Option<f64>,
    /// Frames per second to request.
    pub framerate: Option<f64>,
    /// Number of subsequent frames to boxcar average (1..=20).
    #[serde(default = "default_average")]
    pub average: usize,
    /// Regulate the shutter to keep the peak within the exposure band.
    #[serde(default)]
    pub auto_exposure: bool,
    /// Capture a dark frame and subtract it from subsequent frames.
    #[serde(default)]
    pub dark: bool,
    /// Region of interest in physical units; full sensor if unset.
    pub roi: Option<Roi>,
}

fn default_average() -> usize {
    1
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            shutter: None,
            gain: None,
            framerate: None,
            average: default_average(),
            auto_exposure: false,
            dark: false,
            roi: None,
        }
    }
}

impl CaptureConfig {
    /// Device-independent checks; exposure bounds are checked against the source.
    pub fn validated(self) -> Result<Self> {
        check_range("average", self.average as f64, 1.0, MAX_AVERAGE_WINDOW as f64)?;
        Ok(self)
    }
}

/// Beam-analysis parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Moment/crop passes per frame.
    #[serde(default = "default_crops")]
    pub crops: usize,
    /// Crop radius in beam diameters.
    #[serde(default = "default_rad")]
    pub rad: f64,
    /// Background intensity percentile to subtract, as a fraction in [0, 1].
    #[serde(default)]
    pub background: f64,
    /// Fraction of total intensity to ignore when cropping, in [0, 0.5].
    #[serde(default = "default_ignore")]
    pub ignore: f64,
    /// Move the ROI to follow the beam centroid.
    #[serde(default)]
    pub track: bool,
}

fn default_crops() -> usize {
    DEFAULT_CROP_ITERATIONS
}
fn default_rad() -> f64 {
    DEFAULT_CROP_RADIUS
}
fn default_ignore() -> f64 {
    DEFAULT_IGNORE_FRACTION
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            crops: DEFAULT_CROP_ITERATIONS,
            rad: DEFAULT_CROP_RADIUS,
            background: 0.0,
            ignore: DEFAULT_IGNORE_FRACTION,
            track: false,
        }
    }
}

impl ProcessConfig {
    pub fn validated(self) -> Result<Self> {
        check_range("crops", self.crops as f64, 1.0, 100.0)?;
        check_range("rad", self.rad, f64::MIN_POSITIVE, 100.0)?;
        check_range("background", self.background, 0.0, 1.0)?;
        check_range("ignore", self.ignore, 0.0, MAX_IGNORE_FRACTION)?;
        Ok(self)
    }
}

/// Auto-exposure control loop parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutoExposureConfig {
    /// Percentile of the raw frame that is regulated.
    #[serde(default = "default_percentile")]
    pub percentile: f64,
    /// Maximum shutter adjustments per cycle.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Accepted band for the regulated level, as fractions of maxval.
    #[serde(default = "default_low")]
    pub low: f64,
    #[serde(default = "default_high")]
    pub high: f64,
    /// Shutter factor applied when too bright (its inverse when too dark).
    #[serde(default = "default_adjustment")]
    pub adjustment: f64,
}

fn default_percentile() -> f64 {
    DEFAULT_EXPOSURE_PERCENTILE
}
fn default_max_iterations() -> usize {
    DEFAULT_EXPOSURE_MAX_ITERATIONS
}
fn default_low() -> f64 {
    DEFAULT_EXPOSURE_LOW
}
fn default_high() -> f64 {
    DEFAULT_EXPOSURE_HIGH
}
fn default_adjustment() -> f64 {
    DEFAULT_EXPOSURE_ADJUSTMENT
}

impl Default for AutoExposureConfig {
    fn default() -> Self {
        Self {
            percentile: DEFAULT_EXPOSURE_PERCENTILE,
            max_iterations: DEFAULT_EXPOSURE_MAX_ITERATIONS,
            low: DEFAULT_EXPOSURE_LOW,
            high: DEFAULT_EXPOSURE_HIGH,
            adjustment: DEFAULT_EXPOSURE_ADJUSTMENT,
        }
    }
}

impl AutoExposureConfig {
    pub fn validated(self) -> Result<Self> {
        check_range("percentile", self.percentile, 0.0, 100.0)?;
        check_range("low", self.low, 0.0, 1.0)?;
        check_range("high", self.high, self.low, 1.0)?;
        // open interval (0, 1)
        check_range("adjustment", self.adjustment, f64::MIN_POSITIVE, 1.0 - f64::EPSILON)?;
        Ok(self)
    }
}

pub(crate) fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(BullseyeError::out_of_range(field, value, min, max))
    }
}
