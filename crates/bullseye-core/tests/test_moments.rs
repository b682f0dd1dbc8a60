mod common;

use approx::assert_abs_diff_eq;

use bullseye_core::analysis::{gaussian_fit, moments, FitQuality};
use common::gaussian_frame;

// ---------------------------------------------------------------------------
// Moments of synthetic beams
// ---------------------------------------------------------------------------

#[test]
fn test_recovers_rotated_ellipse() {
    let frame = gaussian_frame((200, 240), (120.0, 100.0), (12.0, 7.0), 0.3, 1000.0);
    let m = moments(frame.view());

    assert_abs_diff_eq!(m.m10, 120.0, epsilon = 1e-9);
    assert_abs_diff_eq!(m.m01, 100.0, epsilon = 1e-9);

    let fit = m.gaussian_fit();
    assert_eq!(fit.quality, FitQuality::Good);
    assert_abs_diff_eq!(fit.major, 48.0, epsilon = 1e-6);
    assert_abs_diff_eq!(fit.minor, 28.0, epsilon = 1e-6);
    assert_abs_diff_eq!(fit.rotation, 0.3, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.amplitude, 1000.0, epsilon = 1e-4);
}

#[test]
fn test_negative_rotation() {
    let frame = gaussian_frame((160, 160), (80.0, 80.0), (10.0, 5.0), -0.4, 50.0);
    let fit = moments(frame.view()).gaussian_fit();
    assert_abs_diff_eq!(fit.rotation, -0.4, epsilon = 1e-9);
    assert!(fit.major > fit.minor);
}

#[test]
fn test_axis_aligned_variances() {
    let frame = gaussian_frame((120, 160), (70.0, 50.0), (8.0, 5.0), 0.0, 10.0);
    let m = moments(frame.view());
    assert_abs_diff_eq!(m.m20, 64.0, epsilon = 1e-6);
    assert_abs_diff_eq!(m.m02, 25.0, epsilon = 1e-6);
    assert_abs_diff_eq!(m.m11, 0.0, epsilon = 1e-6);
}

#[test]
fn test_moments_large_frame_uses_same_result() {
    // above the parallel threshold
    let frame = gaussian_frame((300, 400), (210.0, 140.0), (20.0, 9.0), 1.0, 200.0);
    let fit = moments(frame.view()).gaussian_fit();
    assert_abs_diff_eq!(fit.major, 80.0, epsilon = 1e-6);
    assert_abs_diff_eq!(fit.minor, 36.0, epsilon = 1e-6);
    assert_abs_diff_eq!(fit.rotation, 1.0, epsilon = 1e-9);
}

// ---------------------------------------------------------------------------
// Degenerate input
// ---------------------------------------------------------------------------

#[test]
fn test_zero_frame_floors_total() {
    let frame = ndarray::Array2::<f64>::zeros((480, 640));
    let m = moments(frame.view());
    assert_eq!(m.m00, 1.0);
    assert!(m.is_low_signal(255));
    let fit = m.gaussian_fit();
    assert_eq!(fit.quality, FitQuality::Degenerate);
    assert!(fit.major.is_finite() && fit.minor.is_finite() && fit.rotation.is_finite());
}

#[test]
fn test_few_counts_are_low_signal() {
    let mut frame = ndarray::Array2::<f64>::zeros((480, 640));
    frame[[10, 20]] = 1.0;
    frame[[300, 500]] = 1.0;
    frame[[470, 630]] = 1.0;
    let m = moments(frame.view());
    assert_eq!(m.m00, 3.0);
    assert!(m.is_low_signal(255));
    // the same counts are a real signal on a 2-bit sensor
    assert!(!m.is_low_signal(2));
}

#[test]
fn test_single_column_is_degenerate() {
    let mut frame = ndarray::Array2::<f64>::zeros((20, 20));
    for row in 5..15 {
        frame[[row, 7]] = 3.0;
    }
    let m = moments(frame.view());
    assert_eq!(m.m20, 0.0);
    let fit = m.gaussian_fit();
    assert_eq!(fit.quality, FitQuality::Degenerate);
    assert_eq!(fit.amplitude, 0.0);
}

#[test]
fn test_fit_never_nan() {
    for &(m20, m02, m11) in &[
        (0.0, 0.0, 0.0),
        (1.0, 1.0, 2.0),
        (-3.0, 1.0, 0.5),
        (f64::MIN_POSITIVE, 0.0, 0.0),
    ] {
        let fit = gaussian_fit(1.0, m20, m02, m11);
        assert!(!fit.amplitude.is_nan());
        assert!(!fit.major.is_nan());
        assert!(!fit.minor.is_nan());
        assert!(!fit.rotation.is_nan());
    }
}
