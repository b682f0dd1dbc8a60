#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ndarray::Array2;

use bullseye_core::capture::{ExposureLimits, FrameSource};
use bullseye_core::error::{BullseyeError, Result};
use bullseye_core::frame::{Frame, SensorGeometry};

/// Noise-free elliptical Gaussian.
///
/// `center` is `(col, row)` in pixels, `sigma` is `(major, minor)` in
/// pixels, `theta` the major-axis angle in radians.
pub fn gaussian_frame(
    (height, width): (usize, usize),
    center: (f64, f64),
    sigma: (f64, f64),
    theta: f64,
    amplitude: f64,
) -> Array2<f64> {
    let (sin, cos) = theta.sin_cos();
    Array2::from_shape_fn((height, width), |(row, col)| {
        let dx = col as f64 - center.0;
        let dy = row as f64 - center.1;
        let u = cos * dx + sin * dy;
        let v = -sin * dx + cos * dy;
        amplitude * (-0.5 * ((u / sigma.0).powi(2) + (v / sigma.1).powi(2))).exp()
    })
}

pub fn geometry(width: usize, height: usize) -> SensorGeometry {
    SensorGeometry {
        width,
        height,
        maxval: 255,
        pixel_size: 1.0,
    }
}

pub fn limits() -> ExposureLimits {
    ExposureLimits {
        min_shutter: 1e-5,
        max_shutter: 0.1,
        min_gain: 0.0,
        max_gain: 24.0,
        max_framerate: 30.0,
    }
}

/// Counters shared between a test and the source it handed away.
#[derive(Clone, Default)]
pub struct Counters {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub dequeues: Arc<AtomicUsize>,
}

impl Counters {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn dequeues(&self) -> usize {
        self.dequeues.load(Ordering::SeqCst)
    }
}

/// Cycles through a fixed list of frames.
pub struct ScriptedSource {
    geometry: SensorGeometry,
    frames: Vec<Array2<f64>>,
    next: usize,
    failures: usize,
    delay: Duration,
    counters: Counters,
    shutter: f64,
    gain: f64,
    framerate: f64,
}

impl ScriptedSource {
    pub fn new(geometry: SensorGeometry, frames: Vec<Array2<f64>>) -> Self {
        Self {
            geometry,
            frames,
            next: 0,
            failures: 0,
            delay: Duration::from_millis(1),
            counters: Counters::default(),
            shutter: 1e-3,
            gain: 0.0,
            framerate: 10.0,
        }
    }

    /// The first `n` dequeues fail.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.failures = n;
        self
    }

    /// Every dequeue blocks this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }
}

impl FrameSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn geometry(&self) -> SensorGeometry {
        self.geometry
    }

    fn limits(&self) -> ExposureLimits {
        limits()
    }

    fn start(&mut self) -> Result<()> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn dequeue(&mut self) -> Result<Frame> {
        std::thread::sleep(self.delay);
        let count = self.counters.dequeues.fetch_add(1, Ordering::SeqCst);
        if count < self.failures {
            return Err(BullseyeError::Acquisition("scripted failure".into()));
        }
        let data = self.frames[self.next % self.frames.len()].clone();
        self.next += 1;
        let mut frame = Frame::new(data, 8);
        frame.metadata.frame_index = count as u64;
        Ok(frame)
    }

    fn shutter(&self) -> f64 {
        self.shutter
    }

    fn set_shutter(&mut self, seconds: f64) -> Result<()> {
        self.shutter = seconds;
        Ok(())
    }

    fn gain(&self) -> f64 {
        self.gain
    }

    fn set_gain(&mut self, db: f64) -> Result<()> {
        self.gain = db;
        Ok(())
    }

    fn framerate(&self) -> f64 {
        self.framerate
    }

    fn set_framerate(&mut self, fps: f64) -> Result<()> {
        self.framerate = fps;
        Ok(())
    }
}

/// Brightness proportional to shutter time, saturating at 255.
///
/// At `reference_shutter` the peak sits at `reference_peak` counts.
pub struct ShutterResponsiveSource {
    profile: Array2<f64>,
    pub reference_shutter: f64,
    pub reference_peak: f64,
    pub shutter: f64,
    pub framerate: f64,
    /// Every framerate the source was set to, in order.
    pub framerates: Vec<f64>,
    pub shutters: Vec<f64>,
    pub dequeues: usize,
    pub enqueues: usize,
}

impl ShutterResponsiveSource {
    pub fn new(shutter: f64) -> Self {
        Self {
            profile: gaussian_frame((48, 64), (32.0, 24.0), (6.0, 4.0), 0.0, 1.0),
            reference_shutter: 1e-3,
            reference_peak: 128.0,
            shutter,
            framerate: 5.0,
            framerates: Vec::new(),
            shutters: Vec::new(),
            dequeues: 0,
            enqueues: 0,
        }
    }

    pub fn frame(&self) -> Frame {
        let scale = self.reference_peak * self.shutter / self.reference_shutter;
        Frame::new(self.profile.mapv(|p| (p * scale).min(255.0).floor()), 8)
    }
}

impl FrameSource for ShutterResponsiveSource {
    fn name(&self) -> &str {
        "shutter-responsive"
    }

    fn geometry(&self) -> SensorGeometry {
        geometry(64, 48)
    }

    fn limits(&self) -> ExposureLimits {
        limits()
    }

    fn dequeue(&mut self) -> Result<Frame> {
        self.dequeues += 1;
        Ok(self.frame())
    }

    fn enqueue(&mut self, _frame: Frame) {
        self.enqueues += 1;
    }

    fn shutter(&self) -> f64 {
        self.shutter
    }

    fn set_shutter(&mut self, seconds: f64) -> Result<()> {
        self.shutter = seconds;
        self.shutters.push(seconds);
        Ok(())
    }

    fn gain(&self) -> f64 {
        0.0
    }

    fn set_gain(&mut self, _db: f64) -> Result<()> {
        Ok(())
    }

    fn framerate(&self) -> f64 {
        self.framerate
    }

    fn set_framerate(&mut self, fps: f64) -> Result<()> {
        self.framerate = fps;
        self.framerates.push(fps);
        Ok(())
    }
}
