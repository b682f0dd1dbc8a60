use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{check_range, CaptureConfig};
use crate::consts::{MAX_AVERAGE_WINDOW, MIN_FRAMERATE};
use crate::error::Result;
use crate::frame::{PixelBounds, Roi, SensorGeometry};

use super::source::{ExposureLimits, FrameSource};

/// User-adjustable capture state.
///
/// Shared between the controlling thread and the acquisition worker behind
/// a mutex; every mutation goes through a validating setter that also
/// performs the dependent update (dark invalidation, ROI bounds).
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSettings {
    geometry: SensorGeometry,
    limits: ExposureLimits,
    shutter: f64,
    gain: f64,
    framerate: f64,
    average: usize,
    auto_exposure: bool,
    dark: bool,
    /// Bumped whenever the cached dark frame must be discarded.
    dark_epoch: u64,
    roi: Roi,
    bounds: PixelBounds,
}

impl CaptureSettings {
    /// Settings mirroring the source's current exposure, with a full-sensor ROI.
    pub fn for_source(source: &dyn FrameSource) -> Self {
        let geometry = source.geometry();
        let limits = source.limits();
        let roi = Roi::full(&geometry);
        Self {
            geometry,
            limits,
            shutter: source.shutter().clamp(limits.min_shutter, limits.max_shutter),
            gain: source.gain().clamp(limits.min_gain, limits.max_gain),
            framerate: source
                .framerate()
                .clamp(MIN_FRAMERATE, limits.max_framerate.max(MIN_FRAMERATE)),
            average: 1,
            auto_exposure: false,
            dark: false,
            dark_epoch: 0,
            roi,
            bounds: roi.to_bounds(&geometry),
        }
    }

    /// Apply a configuration, stopping at the first invalid field.
    pub fn apply(&mut self, config: &CaptureConfig) -> Result<()> {
        if let Some(shutter) = config.shutter {
            self.set_shutter(shutter)?;
        }
        if let Some(gain) = config.gain {
            self.set_gain(gain)?;
        }
        if let Some(framerate) = config.framerate {
            self.set_framerate(framerate)?;
        }
        self.set_average(config.average)?;
        self.set_auto_exposure(config.auto_exposure);
        self.set_dark(config.dark);
        if let Some(roi) = config.roi {
            self.set_roi(roi);
        }
        Ok(())
    }

    pub fn geometry(&self) -> &SensorGeometry {
        &self.geometry
    }

    pub fn limits(&self) -> &ExposureLimits {
        &self.limits
    }

    pub fn shutter(&self) -> f64 {
        self.shutter
    }

    /// Set the shutter time; a change invalidates the dark frame.
    pub fn set_shutter(&mut self, seconds: f64) -> Result<()> {
        check_range(
            "shutter",
            seconds,
            self.limits.min_shutter,
            self.limits.max_shutter,
        )?;
        if seconds != self.shutter {
            self.shutter = seconds;
            self.invalidate_dark();
        }
        Ok(())
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Set the gain; a change invalidates the dark frame.
    pub fn set_gain(&mut self, db: f64) -> Result<()> {
        check_range("gain", db, self.limits.min_gain, self.limits.max_gain)?;
        if db != self.gain {
            self.gain = db;
            self.invalidate_dark();
        }
        Ok(())
    }

    pub fn framerate(&self) -> f64 {
        self.framerate
    }

    pub fn set_framerate(&mut self, fps: f64) -> Result<()> {
        check_range("framerate", fps, MIN_FRAMERATE, self.limits.max_framerate)?;
        self.framerate = fps;
        Ok(())
    }

    pub fn average(&self) -> usize {
        self.average
    }

    pub fn set_average(&mut self, frames: usize) -> Result<()> {
        check_range("average", frames as f64, 1.0, MAX_AVERAGE_WINDOW as f64)?;
        self.average = frames;
        Ok(())
    }

    pub fn auto_exposure(&self) -> bool {
        self.auto_exposure
    }

    pub fn set_auto_exposure(&mut self, enabled: bool) {
        self.auto_exposure = enabled;
    }

    pub fn dark(&self) -> bool {
        self.dark
    }

    /// Toggle dark subtraction. Any toggle discards the cached dark frame.
    pub fn set_dark(&mut self, enabled: bool) {
        if enabled != self.dark {
            self.dark = enabled;
            self.dark_epoch += 1;
        }
    }

    pub fn dark_epoch(&self) -> u64 {
        self.dark_epoch
    }

    fn invalidate_dark(&mut self) {
        self.dark = false;
        self.dark_epoch += 1;
    }

    pub fn roi(&self) -> Roi {
        self.roi
    }

    /// Pixel bounds derived from the current ROI.
    pub fn bounds(&self) -> PixelBounds {
        self.bounds
    }

    pub fn set_roi(&mut self, roi: Roi) {
        self.roi = roi;
        self.bounds = roi.to_bounds(&self.geometry);
    }

    /// Keep the ROI size, center it on `(x, y)` (physical units).
    pub fn recenter_roi(&mut self, x: f64, y: f64) {
        self.set_roi(self.roi.centered_on(x, y));
    }
}

/// Lock a settings mutex. The guarded values are plain data that setters
/// leave consistent, so a poisoned lock is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
