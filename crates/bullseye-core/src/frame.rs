use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::MIN_ROI_PIXELS;

/// A single grayscale intensity frame.
/// Pixel values are sensor counts in [0, maxval] as delivered by the source;
/// conditioned frames may go negative after dark subtraction.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f64>,
    /// Bit depth of the source samples (8 or 16)
    pub bit_depth: u8,
    /// Optional per-frame metadata
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(data: Array2<f64>, bit_depth: u8) -> Self {
        Self {
            data,
            bit_depth,
            metadata: FrameMetadata::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameMetadata {
    pub frame_index: u64,
    pub timestamp_us: Option<u64>,
}

/// Static geometry of a sensor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorGeometry {
    pub width: usize,
    pub height: usize,
    /// Largest pixel value the sensor can report.
    pub maxval: u32,
    /// Physical edge length of one pixel (µm).
    pub pixel_size: f64,
}

impl SensorGeometry {
    pub fn bit_depth(&self) -> u8 {
        if self.maxval <= u8::MAX as u32 {
            8
        } else {
            16
        }
    }
}

/// Region of interest in physical units, relative to the sensor center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

impl Roi {
    /// ROI covering the whole sensor.
    pub fn full(geometry: &SensorGeometry) -> Self {
        let px = geometry.pixel_size;
        Self {
            left: -(geometry.width as f64) * px / 2.0,
            bottom: -(geometry.height as f64) * px / 2.0,
            width: geometry.width as f64 * px,
            height: geometry.height as f64 * px,
        }
    }

    /// Same size, centered on `(x, y)`.
    pub fn centered_on(&self, x: f64, y: f64) -> Self {
        Self {
            left: x - self.width / 2.0,
            bottom: y - self.height / 2.0,
            ..*self
        }
    }

    /// Map to integer pixel bounds clamped to the sensor.
    ///
    /// The origin is clamped to leave room for the minimum extent, so
    /// `w >= 8`, `h >= 8`, `l + w <= width` and `b + h <= height` all hold
    /// for sensors of at least 8x8 pixels.
    pub fn to_bounds(&self, geometry: &SensorGeometry) -> PixelBounds {
        let px = geometry.pixel_size;
        let (l, w) = clamp_axis(self.left / px, self.width / px, geometry.width);
        let (b, h) = clamp_axis(self.bottom / px, self.height / px, geometry.height);
        PixelBounds { l, b, w, h }
    }
}

fn clamp_axis(origin: f64, extent: f64, size: usize) -> (usize, usize) {
    let size_f = size as f64;
    let min = MIN_ROI_PIXELS as f64;
    let start = (origin + size_f / 2.0)
        .clamp(0.0, (size_f - min).max(0.0))
        .floor();
    let len = extent.max(min).min(size_f - start).floor();
    // NaN collapses to 0 in the casts; fall back to the full axis.
    if !start.is_finite() || !len.is_finite() || len < 1.0 {
        return (0, size);
    }
    (start as usize, len as usize)
}

/// Integer pixel rectangle: `l`/`b` are the first column/row, `w`/`h` the extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds {
    pub l: usize,
    pub b: usize,
    pub w: usize,
    pub h: usize,
}

impl PixelBounds {
    pub fn full(geometry: &SensorGeometry) -> Self {
        Self {
            l: 0,
            b: 0,
            w: geometry.width,
            h: geometry.height,
        }
    }
}
