use std::collections::VecDeque;

use ndarray::{s, Array2};
use tracing::debug;

use crate::capture::CaptureSettings;
use crate::frame::{Frame, PixelBounds};

/// An analysis-ready frame cropped to the ROI.
#[derive(Clone, Debug)]
pub struct ConditionedFrame {
    pub frame: Frame,
    /// Where `frame` sits on the sensor.
    pub bounds: PixelBounds,
}

/// Turns raw frames into analysis-ready frames: boxcar averaging,
/// dark-frame subtraction and ROI cropping.
///
/// Owns the running-average accumulator and the dark-frame cache; both are
/// reused across frames and never handed out.
#[derive(Default)]
pub struct Conditioner {
    window: VecDeque<Array2<f64>>,
    sum: Option<Array2<f64>>,
    dark: Option<Array2<f64>>,
    dark_epoch: u64,
}

impl Conditioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames currently in the averaging window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn has_dark(&self) -> bool {
        self.dark.is_some()
    }

    /// Condition one raw frame.
    ///
    /// Returns `None` on the cycle that captures the dark frame.
    pub fn condition(&mut self, raw: &Frame, settings: &CaptureSettings) -> Option<ConditionedFrame> {
        let mut data = self.average(&raw.data, settings.average());

        if settings.dark_epoch() != self.dark_epoch || !settings.dark() {
            self.dark = None;
            self.dark_epoch = settings.dark_epoch();
        }
        if settings.dark() {
            match &self.dark {
                Some(dark) if dark.dim() == data.dim() => data -= dark,
                _ => {
                    debug!("captured dark frame");
                    self.dark = Some(data);
                    return None;
                }
            }
        }

        let bounds = clip_bounds(settings.bounds(), data.dim());
        let cropped = data
            .slice(s![bounds.b..bounds.b + bounds.h, bounds.l..bounds.l + bounds.w])
            .to_owned();

        let mut frame = Frame::new(cropped, raw.bit_depth);
        frame.metadata = raw.metadata.clone();
        Some(ConditionedFrame { frame, bounds })
    }

    /// Push `raw` into the averaging window and return the current mean.
    fn average(&mut self, raw: &Array2<f64>, window: usize) -> Array2<f64> {
        if window <= 1 {
            self.window.clear();
            self.sum = None;
            return raw.clone();
        }

        let shape_changed = self.sum.as_ref().is_some_and(|sum| sum.dim() != raw.dim());
        if shape_changed {
            self.window.clear();
            self.sum = None;
        }

        let sum = self
            .sum
            .get_or_insert_with(|| Array2::zeros(raw.dim()));
        while self.window.len() >= window {
            if let Some(oldest) = self.window.pop_front() {
                *sum -= &oldest;
            }
        }
        *sum += raw;
        self.window.push_back(raw.clone());

        sum.mapv(|v| v / self.window.len() as f64)
    }
}

/// Intersect bounds with the actual frame shape `(rows, cols)`.
fn clip_bounds(bounds: PixelBounds, (rows, cols): (usize, usize)) -> PixelBounds {
    let l = bounds.l.min(cols.saturating_sub(1));
    let b = bounds.b.min(rows.saturating_sub(1));
    PixelBounds {
        l,
        b,
        w: bounds.w.min(cols - l).max(1.min(cols)),
        h: bounds.h.min(rows - b).max(1.min(rows)),
    }
}
