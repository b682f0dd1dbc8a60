//! Image moments and the elliptical Gaussian they describe.
//!
//! First and second moments along each axis come from the marginal sums;
//! only the mixed moment `m11` needs a full pass over the pixels.

use std::f64::consts::{PI, SQRT_2};

use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;
use serde::Serialize;

use crate::consts::{LOW_SIGNAL_FULL_SCALE, PARALLEL_PIXEL_THRESHOLD};

/// Zeroth, first and central second moments of a window.
///
/// `m10`/`m01` are the column/row centroid in pixels relative to the
/// window origin; `m20`, `m02`, `m11` are in pixels².
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m02: f64,
    pub m11: f64,
}

/// Compute the moments of `data` (rows = y, columns = x).
///
/// The total is floored to 1 when it is not positive, so every derived
/// quantity stays finite; check [`Moments::is_low_signal`] before trusting
/// the result.
pub fn moments(data: ArrayView2<f64>) -> Moments {
    let (h, w) = data.dim();
    let imx = data.sum_axis(Axis(0));
    let imy = data.sum_axis(Axis(1));

    let total = imx.sum();
    let m00 = if total > 0.0 { total } else { 1.0 };

    let m10 = imx.iter().enumerate().map(|(x, v)| x as f64 * v).sum::<f64>() / m00;
    let m01 = imy.iter().enumerate().map(|(y, v)| y as f64 * v).sum::<f64>() / m00;

    let m20 = imx
        .iter()
        .enumerate()
        .map(|(x, v)| (x as f64 - m10).powi(2) * v)
        .sum::<f64>()
        / m00;
    let m02 = imy
        .iter()
        .enumerate()
        .map(|(y, v)| (y as f64 - m01).powi(2) * v)
        .sum::<f64>()
        / m00;

    let row_term = |row: usize| -> f64 {
        let dy = row as f64 - m01;
        data.row(row)
            .iter()
            .enumerate()
            .map(|(x, v)| (x as f64 - m10) * v)
            .sum::<f64>()
            * dy
    };
    let mixed: f64 = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(row_term).sum()
    } else {
        (0..h).map(row_term).sum()
    };

    Moments {
        m00,
        m10,
        m01,
        m20,
        m02,
        m11: mixed / m00,
    }
}

impl Moments {
    /// Too little intensity to call it a beam: the window holds no more
    /// than one saturated pixel's worth of counts.
    pub fn is_low_signal(&self, maxval: u32) -> bool {
        self.m00 <= LOW_SIGNAL_FULL_SCALE * f64::from(maxval.max(1))
    }

    pub fn gaussian_fit(&self) -> GaussianFit {
        gaussian_fit(self.m00, self.m20, self.m02, self.m11)
    }
}

/// How far the fitted parameters can be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitQuality {
    Good,
    /// Total intensity at or below the noise floor.
    LowSignal,
    /// The covariance matrix is not positive definite.
    Degenerate,
}

/// Elliptical Gaussian equivalent to a set of moments.
///
/// `major`/`minor` are 4-sigma full widths in pixels, `rotation` is the
/// angle of the major axis in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GaussianFit {
    pub amplitude: f64,
    pub major: f64,
    pub minor: f64,
    pub rotation: f64,
    pub quality: FitQuality,
}

/// Derive the Gaussian parameters from the central moments.
///
/// Radicands are clamped at zero so the widths are always finite. A
/// covariance that is not positive definite gives zero amplitude and
/// `Degenerate` quality.
pub fn gaussian_fit(m00: f64, m20: f64, m02: f64, m11: f64) -> GaussianFit {
    let det = m02 * m20 - m11 * m11;
    let q = ((m20 - m02).powi(2) + 4.0 * m11 * m11).sqrt();
    let major = 2.0 * SQRT_2 * (m20 + m02 + q).max(0.0).sqrt();
    let minor = 2.0 * SQRT_2 * (m20 + m02 - q).max(0.0).sqrt();
    let rotation = 0.5 * (2.0 * m11).atan2(m20 - m02);

    // det > 0 with a negative trace is negative definite: minor collapses to 0.
    let degenerate = det.is_nan() || det <= 0.0 || !major.is_finite() || !(minor.is_finite() && minor > 0.0);
    let amplitude = if degenerate {
        0.0
    } else {
        m00 / (2.0 * PI * det.sqrt())
    };

    GaussianFit {
        amplitude,
        major: if major.is_finite() { major } else { 0.0 },
        minor: if minor.is_finite() { minor } else { 0.0 },
        rotation: if rotation.is_finite() { rotation } else { 0.0 },
        quality: if degenerate {
            FitQuality::Degenerate
        } else {
            FitQuality::Good
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_single_pixel() {
        let mut data = Array2::<f64>::zeros((5, 7));
        data[[3, 2]] = 10.0;
        let m = moments(data.view());
        assert_eq!(m.m00, 10.0);
        assert_eq!(m.m10, 2.0);
        assert_eq!(m.m01, 3.0);
        assert_eq!(m.m20, 0.0);
        assert_eq!(m.m11, 0.0);
    }

    #[test]
    fn test_fit_circular() {
        // sigma = 2 -> 4-sigma width = 8
        let fit = gaussian_fit(1.0, 4.0, 4.0, 0.0);
        assert!((fit.major - 8.0).abs() < 1e-12);
        assert!((fit.minor - 8.0).abs() < 1e-12);
        assert!((fit.amplitude - 1.0 / (8.0 * PI)).abs() < 1e-12);
        assert_eq!(fit.quality, FitQuality::Good);
    }

    #[test]
    fn test_fit_line_is_degenerate() {
        // all intensity on a diagonal: det = 0
        let fit = gaussian_fit(1.0, 1.0, 1.0, 1.0);
        assert_eq!(fit.quality, FitQuality::Degenerate);
        assert_eq!(fit.amplitude, 0.0);
        assert!(fit.minor.abs() < 1e-9);
        assert!(fit.major.is_finite());
    }

    #[test]
    fn test_fit_negative_variance_is_finite() {
        let fit = gaussian_fit(1.0, -1.0, -2.0, 0.0);
        assert_eq!(fit.quality, FitQuality::Degenerate);
        assert!(fit.major.is_finite() && fit.minor.is_finite());
    }
}
