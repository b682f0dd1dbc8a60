mod common;

use approx::assert_abs_diff_eq;

use bullseye_core::capture::FrameSource;
use bullseye_core::condition::{auto_expose, exposure_level};
use bullseye_core::config::AutoExposureConfig;
use common::ShutterResponsiveSource;

fn run(source: &mut ShutterResponsiveSource) -> (f64, Vec<f64>) {
    let config = AutoExposureConfig::default();
    let first = source.dequeue().unwrap();
    let mut commits = Vec::new();
    let frame = auto_expose(source, first, 255, &config, |s| commits.push(s)).unwrap();
    (exposure_level(frame.data.view(), config.percentile, 255), commits)
}

#[test]
fn test_in_band_returns_immediately() {
    let mut source = ShutterResponsiveSource::new(1e-3);
    let (level, commits) = run(&mut source);
    assert!(level > 0.25 && level < 0.75, "level = {level}");
    assert!(commits.is_empty());
    assert!(source.framerates.is_empty());
    assert_eq!(source.dequeues, 1);
}

#[test]
fn test_bright_source_converges_down() {
    let mut source = ShutterResponsiveSource::new(4e-3);
    let (level, commits) = run(&mut source);
    assert!(level > 0.25 && level < 0.75, "level = {level}");
    assert_eq!(commits, vec![2e-3, 1e-3]);
    assert_abs_diff_eq!(source.shutter, 1e-3);
    // forced to maximum, then restored
    assert_eq!(source.framerates, vec![30.0, 5.0]);
}

#[test]
fn test_dim_source_converges_up() {
    let mut source = ShutterResponsiveSource::new(1e-4);
    let (level, commits) = run(&mut source);
    assert!(level > 0.25 && level < 0.75, "level = {level}");
    assert_eq!(commits.len(), 3);
    assert_abs_diff_eq!(source.shutter, 8e-4, epsilon = 1e-12);
    assert_eq!(source.framerate, 5.0);
}

#[test]
fn test_dark_source_stops_at_max_shutter() {
    let mut source = ShutterResponsiveSource::new(1e-3);
    source.reference_peak = 0.0;
    let (_, commits) = run(&mut source);
    assert!(commits.iter().all(|&s| (1e-5..=0.1).contains(&s)));
    assert_eq!(source.shutter, 0.1);
    assert!(commits.len() <= AutoExposureConfig::default().max_iterations);
}

#[test]
fn test_saturated_source_stops_at_min_shutter() {
    let mut source = ShutterResponsiveSource::new(1e-3);
    source.reference_peak = 1e9;
    let (level, commits) = run(&mut source);
    assert!(commits.iter().all(|&s| (1e-5..=0.1).contains(&s)));
    assert_eq!(source.shutter, 1e-5);
    assert!(level > 0.75);
}

#[test]
fn test_stale_frame_flushed_after_change() {
    let mut source = ShutterResponsiveSource::new(4e-3);
    run(&mut source);
    // initial + 3 search dequeues + 2 flushes after the two changes
    assert_eq!(source.dequeues, 6);
    assert_eq!(source.enqueues, 5);
}

#[test]
fn test_iteration_budget() {
    let mut source = ShutterResponsiveSource::new(1e-3);
    source.reference_peak = 1e-12;
    let config = AutoExposureConfig {
        max_iterations: 3,
        ..AutoExposureConfig::default()
    };
    let first = source.dequeue().unwrap();
    let mut commits = Vec::new();
    auto_expose(&mut source, first, 255, &config, |s| commits.push(s)).unwrap();
    assert_eq!(commits.len(), 3);
    assert_abs_diff_eq!(source.shutter, 8e-3, epsilon = 1e-12);
}
