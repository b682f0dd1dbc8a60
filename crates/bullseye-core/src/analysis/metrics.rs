use std::fmt::Write as _;

use serde::Serialize;
use tracing::{debug, warn};

use crate::condition::ConditionedFrame;
use crate::config::ProcessConfig;
use crate::frame::SensorGeometry;

use super::crop::converge;
use super::moments::FitQuality;
use super::projection::{build, ProjectionInput, ProjectionSet};

/// Beam parameters of one processed frame.
///
/// Lengths are physical units relative to the sensor center, `t` is in
/// degrees, `black` and `peak` are fractions of full scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BeamMetrics {
    pub x: f64,
    pub y: f64,
    pub t: f64,
    /// Major 4-sigma width.
    pub a: f64,
    /// Minor 4-sigma width.
    pub b: f64,
    /// RMS of `a` and `b`.
    pub d: f64,
    /// Ellipticity `b / a`.
    pub e: f64,
    pub black: f64,
    pub peak: f64,
    pub include_radius: f64,
    pub m00: f64,
    pub m20: f64,
    pub m02: f64,
    pub quality: FitQuality,
}

impl BeamMetrics {
    /// False for frames without a usable beam.
    pub fn is_valid(&self) -> bool {
        self.quality == FitQuality::Good
    }

    /// Human readable multi-line block, four significant digits per value.
    pub fn summary(&self) -> String {
        let g = |v: f64| significant(v, SUMMARY_DIGITS);
        let mut s = String::new();
        let _ = writeln!(s, "centroid x: {} µm", g(self.x));
        let _ = writeln!(s, "centroid y: {} µm", g(self.y));
        let _ = writeln!(s, "major 4sig: {} µm", g(self.a));
        let _ = writeln!(s, "minor 4sig: {} µm", g(self.b));
        let _ = writeln!(s, "rotation: {}°", g(self.t));
        let _ = writeln!(s, "ellipticity: {}", g(self.e));
        let _ = writeln!(s, "black-peak: {}-{}", g(self.black), g(self.peak));
        let _ = writeln!(s, "include radius: {} µm", g(self.include_radius));
        s
    }
}

const SUMMARY_DIGITS: usize = 4;

/// `value` rounded to `digits` significant digits, printed like C's `%g`:
/// trailing zeros dropped, exponent form outside `[1e-4, 10^digits)`.
fn significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let digits = digits.max(1);
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= digits as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Metrics and display data of one frame.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub metrics: BeamMetrics,
    pub projections: ProjectionSet,
}

/// Run crop convergence, the Gaussian fit and the projections on a
/// conditioned frame.
pub fn analyze(
    conditioned: &ConditionedFrame,
    geometry: &SensorGeometry,
    config: &ProcessConfig,
) -> Analysis {
    let data = conditioned.frame.data.view();
    let bounds = &conditioned.bounds;
    let maxval = f64::from(geometry.maxval.max(1));
    let px = geometry.pixel_size;

    let crop = converge(data, config, geometry.maxval);
    let m = crop.moments;
    let fit = m.gaussian_fit();
    let quality = if m.is_low_signal(geometry.maxval) {
        FitQuality::LowSignal
    } else {
        fit.quality
    };

    let a = fit.major * px;
    let b = fit.minor * px;
    let metrics = BeamMetrics {
        x: (m.m10 + bounds.l as f64 - geometry.width as f64 / 2.0) * px,
        y: (m.m01 + bounds.b as f64 - geometry.height as f64 / 2.0) * px,
        t: fit.rotation.to_degrees(),
        a,
        b,
        d: ((a * a + b * b) / 2.0).sqrt(),
        e: if fit.major > 0.0 {
            fit.minor / fit.major
        } else {
            0.0
        },
        black: crop.black / maxval,
        peak: (fit.amplitude + crop.black) / maxval,
        include_radius: crop.include_radius * px,
        m00: m.m00,
        m20: m.m20,
        m02: m.m02,
        quality,
    };

    debug!(
        x = metrics.x,
        y = metrics.y,
        a = metrics.a,
        b = metrics.b,
        t = metrics.t,
        e = metrics.e,
        black = metrics.black,
        peak = metrics.peak,
        include_radius = metrics.include_radius,
        "beam"
    );
    match quality {
        FitQuality::Good => {}
        FitQuality::LowSignal => warn!(m00 = m.m00, "no beam detected"),
        FitQuality::Degenerate => warn!(
            m20 = m.m20,
            m02 = m.m02,
            m11 = m.m11,
            "degenerate beam covariance"
        ),
    }

    let projections = build(&ProjectionInput {
        frame: data,
        bounds,
        geometry,
        moments: &m,
        fit: &fit,
        rad: config.rad,
    });

    Analysis {
        metrics,
        projections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significant_digits() {
        assert_eq!(significant(0.8, 4), "0.8");
        assert_eq!(significant(20.0, 4), "20");
        assert_eq!(significant(123.456, 4), "123.5");
        assert_eq!(significant(-0.012346, 4), "-0.01235");
        assert_eq!(significant(9999.6, 4), "1e+04");
        assert_eq!(significant(123456.0, 4), "1.235e+05");
        assert_eq!(significant(0.00001234, 4), "1.234e-05");
        assert_eq!(significant(0.0, 4), "0");
    }
}
