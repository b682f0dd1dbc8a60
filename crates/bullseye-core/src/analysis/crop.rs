//! Iterative narrowing of the analysis window around the beam.

use ndarray::{s, Array2, ArrayView2};
use tracing::trace;

use crate::config::ProcessConfig;
use crate::consts::MIN_CROP_HALF_WIDTH;
use crate::frame::PixelBounds;

use super::moments::{moments, Moments};
use super::stats::percentile;
use super::sums::polar_sum;

/// Outcome of [`converge`].
#[derive(Clone, Debug)]
pub struct CropResult {
    /// Moments of the final window; centroids are relative to the full
    /// input frame.
    pub moments: Moments,
    /// Radius of the last crop in pixels.
    pub include_radius: f64,
    /// Final window within the input frame.
    pub window: PixelBounds,
    /// Total background subtracted over all passes, in counts.
    pub black: f64,
}

/// Crop window half-widths around a centroid.
#[derive(Clone, Copy, Debug, PartialEq)]
struct HalfWidths {
    x: f64,
    y: f64,
    radius: f64,
}

fn half_widths(window: ArrayView2<f64>, m: &Moments, config: &ProcessConfig) -> HalfWidths {
    let (x, y, radius) = if config.ignore > 0.0 {
        // Encircled energy: smallest ring count holding (1 - ignore) of m00.
        let rings = polar_sum(window, (m.m01, m.m10), 1.0);
        let target = (1.0 - config.ignore) * m.m00;
        let mut cumulative = 0.0;
        let radius = rings
            .iter()
            .take_while(|&&v| {
                cumulative += v;
                cumulative <= target
            })
            .count() as f64;
        (radius, radius, radius)
    } else {
        let x = config.rad * 4.0 * m.m20.max(0.0).sqrt();
        let y = config.rad * 4.0 * m.m02.max(0.0).sqrt();
        (x, y, ((x * x + y * y) / 2.0).sqrt())
    };
    HalfWidths {
        x: x.max(MIN_CROP_HALF_WIDTH),
        y: y.max(MIN_CROP_HALF_WIDTH),
        radius,
    }
}

/// `[center - half, center + half]` intersected with `[0, size)`.
fn crop_axis(center: f64, half: f64, size: usize) -> (usize, usize) {
    let center = if center.is_finite() {
        center.clamp(0.0, size as f64)
    } else {
        size as f64 / 2.0
    };
    let start = (center - half).max(0.0) as usize;
    let end = ((center + half).min(size as f64) as usize).min(size);
    if end > start {
        (start, end - start)
    } else {
        (0, size)
    }
}

/// Run `config.crops` passes of background removal, moments and cropping.
///
/// Each pass but the last shrinks the window around the current centroid;
/// the last pass only measures.
pub fn converge(frame: ArrayView2<f64>, config: &ProcessConfig, maxval: u32) -> CropResult {
    let passes = config.crops.max(1);
    let (h, w) = frame.dim();
    let mut window: Array2<f64> = frame.to_owned();
    let mut bounds = PixelBounds { l: 0, b: 0, w, h };
    let mut black = 0.0;
    let mut include_radius = None;
    let mut m = Moments::default();

    for pass in 0..passes {
        if config.background > 0.0 {
            let level = percentile(window.view(), config.background * 100.0);
            window.mapv_inplace(|v| (v - level).clamp(0.0, f64::from(maxval)));
            black += level;
        }
        m = moments(window.view());
        if pass + 1 == passes {
            break;
        }

        let half = half_widths(window.view(), &m, config);
        let (dl, cw) = crop_axis(m.m10, half.x, window.ncols());
        let (db, ch) = crop_axis(m.m01, half.y, window.nrows());
        trace!(pass, dl, db, cw, ch, "crop");
        window = window.slice(s![db..db + ch, dl..dl + cw]).to_owned();
        bounds = PixelBounds {
            l: bounds.l + dl,
            b: bounds.b + db,
            w: cw,
            h: ch,
        };
        include_radius = Some(half.radius);
    }

    let include_radius =
        include_radius.unwrap_or_else(|| half_widths(window.view(), &m, config).radius);
    m.m10 += bounds.l as f64;
    m.m01 += bounds.b as f64;

    CropResult {
        moments: m,
        include_radius,
        window: bounds,
        black,
    }
}
