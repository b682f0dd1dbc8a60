//! 1-D projections, ideal Gaussian overlays and marker geometry for display.
//!
//! Axis coordinates are physical units relative to the sensor center;
//! intensity arrays are in counts.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

use ndarray::{ArrayView2, Axis};
use serde::Serialize;

use crate::consts::ELLIPSE_POINTS;
use crate::frame::{PixelBounds, SensorGeometry};

use super::moments::{GaussianFit, Moments};
use super::sums::angle_sum;

/// Point sequence in physical units.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Polyline {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Tick positions at the centroid and ±2σ on one axis, with the height of
/// the matching Gaussian peak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AxisTicks {
    pub zero: f64,
    pub plus: f64,
    pub minus: f64,
    pub bar: [f64; 2],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Markers {
    /// 2σ ellipse (the 4-sigma widths as diameters).
    pub ell1: Polyline,
    /// 6σ ellipse.
    pub ell3: Polyline,
    pub major_axis: Polyline,
    pub minor_axis: Polyline,
    pub x: AxisTicks,
    pub y: AxisTicks,
    pub a: AxisTicks,
    pub b: AxisTicks,
}

/// Everything a profile display needs besides the image itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProjectionSet {
    /// Pixel centers along x and y.
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Pixel edges, one more than the centers.
    pub xbounds: Vec<f64>,
    pub ybounds: Vec<f64>,
    pub imx: Vec<f64>,
    pub imy: Vec<f64>,
    pub gx: Vec<f64>,
    pub gy: Vec<f64>,
    /// Positions along the major/minor axis relative to the centroid.
    pub a: Vec<f64>,
    pub b: Vec<f64>,
    pub ima: Vec<f64>,
    pub imb: Vec<f64>,
    pub ga: Vec<f64>,
    pub gb: Vec<f64>,
    pub markers: Markers,
}

impl ProjectionSet {
    /// Flatten into stable array names for plotting front ends.
    pub fn to_named_arrays(&self) -> BTreeMap<&'static str, Vec<f64>> {
        let m = &self.markers;
        let mut out = BTreeMap::new();
        for (name, values) in [
            ("x", &self.x),
            ("y", &self.y),
            ("xbounds", &self.xbounds),
            ("ybounds", &self.ybounds),
            ("imx", &self.imx),
            ("imy", &self.imy),
            ("gx", &self.gx),
            ("gy", &self.gy),
            ("a", &self.a),
            ("b", &self.b),
            ("ima", &self.ima),
            ("imb", &self.imb),
            ("ga", &self.ga),
            ("gb", &self.gb),
            ("ell1_x", &m.ell1.x),
            ("ell1_y", &m.ell1.y),
            ("ell3_x", &m.ell3.x),
            ("ell3_y", &m.ell3.y),
            ("a_x", &m.major_axis.x),
            ("a_y", &m.major_axis.y),
            ("b_x", &m.minor_axis.x),
            ("b_y", &m.minor_axis.y),
        ] {
            out.insert(name, values.clone());
        }
        for (axis, ticks) in [("x", &m.x), ("y", &m.y), ("a", &m.a), ("b", &m.b)] {
            let (zero, plus, minus, bar) = tick_names(axis);
            out.insert(zero, vec![ticks.zero; 2]);
            out.insert(plus, vec![ticks.plus; 2]);
            out.insert(minus, vec![ticks.minus; 2]);
            out.insert(bar, ticks.bar.to_vec());
        }
        out
    }
}

fn tick_names(axis: &str) -> (&'static str, &'static str, &'static str, &'static str) {
    match axis {
        "x" => ("x0_mark", "xp_mark", "xm_mark", "x_bar"),
        "y" => ("y0_mark", "yp_mark", "ym_mark", "y_bar"),
        "a" => ("a0_mark", "ap_mark", "am_mark", "a_bar"),
        _ => ("b0_mark", "bp_mark", "bm_mark", "b_bar"),
    }
}

/// Inputs shared by all projections of one frame.
pub struct ProjectionInput<'a> {
    /// Conditioned frame (the ROI, not the crop window).
    pub frame: ArrayView2<'a, f64>,
    /// Where `frame` sits on the sensor.
    pub bounds: &'a PixelBounds,
    pub geometry: &'a SensorGeometry,
    /// Final moments, centroids relative to `frame`.
    pub moments: &'a Moments,
    pub fit: &'a GaussianFit,
    /// Crop radius in beam diameters.
    pub rad: f64,
}

/// Area-normalized 1-D Gaussian with variance `var` scaled to `total`.
fn gaussian_curve(coords: &[f64], center: f64, var: f64, total: f64) -> Vec<f64> {
    let peak = gaussian_peak(var, total);
    if peak == 0.0 {
        return vec![0.0; coords.len()];
    }
    coords
        .iter()
        .map(|c| peak * (-(c - center).powi(2) / (2.0 * var)).exp())
        .collect()
}

fn gaussian_peak(var: f64, total: f64) -> f64 {
    if var > 0.0 {
        total / (2.0 * PI * var).sqrt()
    } else {
        0.0
    }
}

/// Pixel centers relative to the sensor center, in pixels.
fn pixel_axis(start: usize, len: usize, size: usize) -> Vec<f64> {
    (start..start + len)
        .map(|i| i as f64 - size as f64 / 2.0)
        .collect()
}

fn edges(centers: &[f64], px: f64) -> Vec<f64> {
    let mut out: Vec<f64> = centers.iter().map(|c| (c - 0.5) * px).collect();
    if let Some(last) = centers.last() {
        out.push((last + 0.5) * px);
    }
    out
}

/// Rotated projection truncated to `±rad * width` around the centroid.
struct AxisProfile {
    coords: Vec<f64>,
    sums: Vec<f64>,
}

fn axis_profile(
    frame: ArrayView2<f64>,
    angle: f64,
    binsize: f64,
    centroid: f64,
    reach: f64,
) -> AxisProfile {
    let proj = angle_sum(frame, angle, binsize);
    let center = proj.bin_of(centroid);
    let n = proj.sums.len();
    let half = reach / binsize;
    let start = (center - half).max(0.0).min(n as f64) as usize;
    let end = ((center + half).min(n as f64).max(0.0) as usize).max(start);
    AxisProfile {
        coords: (start..end).map(|k| (k as f64 - center) * binsize).collect(),
        sums: proj.sums[start..end].to_vec(),
    }
}

/// Build all projections and markers for one analyzed frame.
pub fn build(input: &ProjectionInput<'_>) -> ProjectionSet {
    let ProjectionInput {
        frame,
        bounds,
        geometry,
        moments: m,
        fit,
        rad,
    } = *input;
    let px = geometry.pixel_size;
    let (h, w) = frame.dim();

    // Centroid relative to the sensor center, in pixels.
    let cx = m.m10 + bounds.l as f64 - geometry.width as f64 / 2.0;
    let cy = m.m01 + bounds.b as f64 - geometry.height as f64 / 2.0;

    let xs = pixel_axis(bounds.l, w, geometry.width);
    let ys = pixel_axis(bounds.b, h, geometry.height);
    let gx = gaussian_curve(&xs, cx, m.m20, m.m00);
    let gy = gaussian_curve(&ys, cy, m.m02, m.m00);

    let t = fit.rotation;
    let (sin, cos) = t.sin_cos();
    let dab = cos.abs().max(sin.abs());
    // Centroid relative to the frame center.
    let fx = m.m10 - w as f64 / 2.0;
    let fy = m.m01 - h as f64 / 2.0;
    let major = axis_profile(frame, t, dab, cos * fx + sin * fy, rad * fit.major);
    let minor = axis_profile(frame, t + FRAC_PI_2, dab, -sin * fx + cos * fy, rad * fit.minor);

    // sigma = width / 4; each bin spans `dab` pixels of axis.
    let var_a = (fit.major / 4.0).powi(2);
    let var_b = (fit.minor / 4.0).powi(2);
    let ga = gaussian_curve(&major.coords, 0.0, var_a, m.m00 * dab);
    let gb = gaussian_curve(&minor.coords, 0.0, var_b, m.m00 * dab);

    let markers = markers(&MarkerInput {
        x: cx * px,
        y: cy * px,
        a: fit.major * px,
        b: fit.minor * px,
        t,
        rad,
        sx: m.m20.max(0.0).sqrt() * px,
        sy: m.m02.max(0.0).sqrt() * px,
        x_bar: gaussian_peak(m.m20, m.m00),
        y_bar: gaussian_peak(m.m02, m.m00),
        a_bar: gaussian_peak(var_a, m.m00 * dab),
        b_bar: gaussian_peak(var_b, m.m00 * dab),
    });

    ProjectionSet {
        xbounds: edges(&xs, px),
        ybounds: edges(&ys, px),
        x: xs.iter().map(|v| v * px).collect(),
        y: ys.iter().map(|v| v * px).collect(),
        imx: frame.sum_axis(Axis(0)).to_vec(),
        imy: frame.sum_axis(Axis(1)).to_vec(),
        gx,
        gy,
        a: major.coords.iter().map(|v| v * px).collect(),
        b: minor.coords.iter().map(|v| v * px).collect(),
        ima: major.sums,
        imb: minor.sums,
        ga,
        gb,
        markers,
    }
}

/// Beam geometry in physical units for marker construction.
struct MarkerInput {
    x: f64,
    y: f64,
    a: f64,
    b: f64,
    t: f64,
    rad: f64,
    sx: f64,
    sy: f64,
    x_bar: f64,
    y_bar: f64,
    a_bar: f64,
    b_bar: f64,
}

fn markers(p: &MarkerInput) -> Markers {
    let (sin, cos) = p.t.sin_cos();
    let (ex, ey): (Vec<f64>, Vec<f64>) = (0..ELLIPSE_POINTS)
        .map(|i| {
            let s = 2.0 * PI * i as f64 / (ELLIPSE_POINTS - 1) as f64;
            let (u, v) = (p.a / 2.0 * s.cos(), p.b / 2.0 * s.sin());
            (u * cos - v * sin, u * sin + v * cos)
        })
        .unzip();
    let ellipse = |scale: f64| Polyline {
        x: ex.iter().map(|e| p.x + scale * e).collect(),
        y: ey.iter().map(|e| p.y + scale * e).collect(),
    };
    let k = [-p.rad, p.rad];

    Markers {
        ell1: ellipse(1.0),
        ell3: ellipse(3.0),
        major_axis: Polyline {
            x: k.iter().map(|k| p.a * k * cos + p.x).collect(),
            y: k.iter().map(|k| p.a * k * sin + p.y).collect(),
        },
        minor_axis: Polyline {
            x: k.iter().map(|k| -p.b * k * sin + p.x).collect(),
            y: k.iter().map(|k| p.b * k * cos + p.y).collect(),
        },
        x: AxisTicks {
            zero: p.x,
            plus: p.x + 2.0 * p.sx,
            minus: p.x - 2.0 * p.sx,
            bar: [0.0, p.x_bar],
        },
        y: AxisTicks {
            zero: p.y,
            plus: p.y + 2.0 * p.sy,
            minus: p.y - 2.0 * p.sy,
            bar: [0.0, p.y_bar],
        },
        a: AxisTicks {
            zero: 0.0,
            plus: p.a / 2.0,
            minus: -p.a / 2.0,
            bar: [0.0, p.a_bar],
        },
        b: AxisTicks {
            zero: 0.0,
            plus: p.b / 2.0,
            minus: -p.b / 2.0,
            bar: [0.0, p.b_bar],
        },
    }
}
