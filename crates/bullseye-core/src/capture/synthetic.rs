//! Simulated camera that renders a rotated elliptical Gaussian beam.
//!
//! Brightness is proportional to shutter time and saturates at `maxval`,
//! which makes the source usable as a plant for the auto-exposure loop.

use std::time::{Duration, Instant};

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::consts::{SYNTHETIC_HEIGHT, SYNTHETIC_WIDTH};
use crate::error::{BullseyeError, Result};
use crate::frame::{Frame, SensorGeometry};

use super::source::{ExposureLimits, FrameSource};

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: usize,
    pub height: usize,
    pub maxval: u32,
    pub pixel_size: f64,
    /// Beam center relative to the sensor center (physical units).
    pub center: (f64, f64),
    /// Standard deviation along the major axis (physical units).
    pub sigma_major: f64,
    /// Standard deviation along the minor axis (physical units).
    pub sigma_minor: f64,
    pub rotation_deg: f64,
    /// Peak level as a fraction of `maxval` at the reference shutter.
    pub peak_fraction: f64,
    /// Shutter time at which the peak equals `peak_fraction * maxval`.
    pub reference_shutter: f64,
    /// Relative multiplicative noise (standard deviation).
    pub noise: f64,
    pub seed: u64,
    /// Sleep between frames to honor the framerate.
    pub throttle: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: SYNTHETIC_WIDTH,
            height: SYNTHETIC_HEIGHT,
            maxval: u8::MAX as u32,
            pixel_size: 1.0,
            center: (20.0, 30.0),
            sigma_major: 50.0 / 4.0,
            sigma_minor: 40.0 / 4.0,
            rotation_deg: 15.0,
            peak_fraction: 0.7,
            reference_shutter: 1e-3,
            noise: 0.1,
            seed: 0,
            throttle: true,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    /// Noise-free beam profile with unit peak.
    profile: Array2<f64>,
    rng: StdRng,
    shutter: f64,
    gain: f64,
    framerate: f64,
    frame_index: u64,
    last_frame: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let profile = render_profile(&config);
        let rng = StdRng::seed_from_u64(config.seed);
        let shutter = config.reference_shutter;
        Self {
            config,
            profile,
            rng,
            shutter,
            gain: 0.0,
            framerate: 10.0,
            frame_index: 0,
            last_frame: None,
        }
    }

    fn wait_for_frame_slot(&mut self) {
        if let Some(last) = self.last_frame {
            let period = Duration::from_secs_f64(1.0 / self.framerate.max(1e-3));
            let elapsed = last.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

fn render_profile(config: &SyntheticConfig) -> Array2<f64> {
    let px = config.pixel_size;
    let (sin_t, cos_t) = config.rotation_deg.to_radians().sin_cos();
    let (cx, cy) = config.center;
    let (w, h) = (config.width as f64, config.height as f64);
    Array2::from_shape_fn((config.height, config.width), |(row, col)| {
        let i = (col as f64 - w / 2.0) * px - cx;
        let j = (row as f64 - h / 2.0) * px - cy;
        let u = cos_t * i + sin_t * j;
        let v = -sin_t * i + cos_t * j;
        (-((u / config.sigma_major).powi(2) + (v / config.sigma_minor).powi(2)) / 2.0).exp()
    })
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn geometry(&self) -> SensorGeometry {
        SensorGeometry {
            width: self.config.width,
            height: self.config.height,
            maxval: self.config.maxval,
            pixel_size: self.config.pixel_size,
        }
    }

    fn limits(&self) -> ExposureLimits {
        ExposureLimits {
            min_shutter: 1e-5,
            max_shutter: 0.1,
            min_gain: 0.0,
            max_gain: 24.0,
            max_framerate: 10.0,
        }
    }

    fn dequeue(&mut self) -> Result<Frame> {
        if self.config.throttle {
            self.wait_for_frame_slot();
        }
        let maxval = self.config.maxval as f64;
        let gain = 10f64.powf(self.gain / 20.0);
        let scale = maxval * self.config.peak_fraction * gain * self.shutter
            / self.config.reference_shutter;
        let noise = if self.config.noise > 0.0 {
            Some(
                Normal::new(1.0, self.config.noise)
                    .map_err(|e| BullseyeError::Acquisition(e.to_string()))?,
            )
        } else {
            None
        };
        let rng = &mut self.rng;
        let data = self.profile.mapv(|p| {
            let jitter = noise.as_ref().map_or(1.0, |n| n.sample(&mut *rng));
            (p * scale * jitter + 0.5).floor().clamp(0.0, maxval)
        });

        let mut frame = Frame::new(data, self.geometry().bit_depth());
        frame.metadata.frame_index = self.frame_index;
        self.frame_index += 1;
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
