mod common;

use approx::assert_abs_diff_eq;

use bullseye_core::analysis::converge;
use bullseye_core::config::ProcessConfig;
use common::gaussian_frame;

fn beam() -> ndarray::Array2<f64> {
    gaussian_frame((200, 240), (130.0, 90.0), (8.0, 5.0), 0.5, 1000.0)
}

fn sigma_config(crops: usize) -> ProcessConfig {
    ProcessConfig {
        crops,
        ignore: 0.0,
        ..ProcessConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Sigma-radius cropping
// ---------------------------------------------------------------------------

#[test]
fn test_window_reaches_fixed_point() {
    let frame = beam();
    let three = converge(frame.view(), &sigma_config(3), 255);
    let six = converge(frame.view(), &sigma_config(6), 255);
    assert_eq!(three.window, six.window);
    assert_abs_diff_eq!(three.moments.m10, six.moments.m10, epsilon = 1e-6);
    assert_abs_diff_eq!(three.moments.m01, six.moments.m01, epsilon = 1e-6);
}

#[test]
fn test_window_is_six_sigma_box() {
    let result = converge(beam().view(), &sigma_config(3), 255);
    // sigma_x = 7.419, sigma_y = 5.828 for this rotation; rad 1.5 -> 6 sigma half widths
    assert_eq!(result.window.l, 85);
    assert_eq!(result.window.w, 174 - 85);
    assert_eq!(result.window.b, 55);
    assert_eq!(result.window.h, 124 - 55);
    assert_abs_diff_eq!(result.moments.m10, 130.0, epsilon = 1e-4);
    assert_abs_diff_eq!(result.moments.m01, 90.0, epsilon = 1e-4);
}

#[test]
fn test_minimum_half_width() {
    let mut frame = ndarray::Array2::<f64>::zeros((50, 50));
    frame[[20, 30]] = 100.0;
    let result = converge(frame.view(), &sigma_config(2), 255);
    assert_eq!(result.window.l, 26);
    assert_eq!(result.window.w, 8);
    assert_eq!(result.window.b, 16);
    assert_eq!(result.window.h, 8);
    assert_eq!(result.moments.m10, 30.0);
    assert_eq!(result.moments.m01, 20.0);
}

#[test]
fn test_beam_near_edge_clips_window() {
    let frame = gaussian_frame((100, 100), (3.0, 50.0), (4.0, 4.0), 0.0, 500.0);
    let result = converge(frame.view(), &sigma_config(3), 255);
    assert_eq!(result.window.l, 0);
    assert!(result.window.l + result.window.w <= 100);
}

// ---------------------------------------------------------------------------
// Encircled-energy cropping
// ---------------------------------------------------------------------------

#[test]
fn test_encircled_energy_crop_is_isotropic() {
    let config = ProcessConfig {
        crops: 3,
        ignore: 0.01,
        ..ProcessConfig::default()
    };
    let result = converge(beam().view(), &config, 255);
    let r = result.include_radius;
    // 99% of an 8x5 sigma beam lies between 2 and 4 major sigmas
    assert!(r > 10.0 && r < 32.0, "radius = {r}");
    assert!((result.window.w as f64 - 2.0 * r).abs() <= 2.0);
    assert!((result.window.h as f64 - 2.0 * r).abs() <= 2.0);
    assert_abs_diff_eq!(result.moments.m10, 130.0, epsilon = 0.5);
    assert_abs_diff_eq!(result.moments.m01, 90.0, epsilon = 0.5);
}

#[test]
fn test_encircled_energy_reaches_fixed_point() {
    let config = |crops| ProcessConfig {
        crops,
        ignore: 0.01,
        ..ProcessConfig::default()
    };
    let frame = beam();
    let three = converge(frame.view(), &config(3), 255);
    let six = converge(frame.view(), &config(6), 255);
    assert_eq!(three.window, six.window);
    assert_eq!(three.window.l, 109);
    assert_eq!(three.window.b, 69);
    assert_eq!(three.window.w, 40);
    assert_eq!(three.window.h, 40);
    assert_eq!(three.include_radius, six.include_radius);
    assert_abs_diff_eq!(three.moments.m10, six.moments.m10, epsilon = 1e-6);
    assert_abs_diff_eq!(three.moments.m01, six.moments.m01, epsilon = 1e-6);
}

// ---------------------------------------------------------------------------
// Background subtraction
// ---------------------------------------------------------------------------

#[test]
fn test_background_accumulates() {
    let frame = beam().mapv(|v| v + 10.0);
    let config = ProcessConfig {
        crops: 3,
        ignore: 0.0,
        background: 0.05,
        ..ProcessConfig::default()
    };
    let result = converge(frame.view(), &config, 4095);
    assert!(result.black >= 10.0 && result.black < 11.0, "black = {}", result.black);
    assert_abs_diff_eq!(result.moments.m10, 130.0, epsilon = 0.05);
    assert_abs_diff_eq!(result.moments.m01, 90.0, epsilon = 0.05);
}

#[test]
fn test_no_background_means_no_black() {
    let result = converge(beam().view(), &sigma_config(3), 255);
    assert_eq!(result.black, 0.0);
}
