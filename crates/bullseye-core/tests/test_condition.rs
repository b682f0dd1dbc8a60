mod common;

use approx::assert_abs_diff_eq;
use ndarray::{s, Array2};

use bullseye_core::capture::CaptureSettings;
use bullseye_core::condition::Conditioner;
use bullseye_core::frame::{Frame, PixelBounds, Roi};
use common::{geometry, ScriptedSource};

fn settings() -> CaptureSettings {
    let source = ScriptedSource::new(geometry(16, 16), vec![Array2::zeros((16, 16))]);
    CaptureSettings::for_source(&source)
}

fn frame(seed: usize) -> Frame {
    Frame::new(
        Array2::from_shape_fn((16, 16), |(r, c)| ((r * 31 + c * 17 + seed * 7) % 23) as f64),
        8,
    )
}

fn assert_frames_close(actual: &Array2<f64>, expected: &Array2<f64>) {
    assert_eq!(actual.dim(), expected.dim());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*a, *e, epsilon = 1e-9);
    }
}

// ---------------------------------------------------------------------------
// Averaging
// ---------------------------------------------------------------------------

#[test]
fn test_single_frame_is_a_copy() {
    let mut conditioner = Conditioner::new();
    let raw = frame(1);
    let out = conditioner.condition(&raw, &settings()).unwrap();
    assert_eq!(out.frame.data, raw.data);
    assert_eq!(out.bounds, PixelBounds { l: 0, b: 0, w: 16, h: 16 });
}

#[test]
fn test_average_is_arithmetic_mean() {
    let mut settings = settings();
    settings.set_average(4).unwrap();
    let mut conditioner = Conditioner::new();

    let frames: Vec<Frame> = (0..4).map(frame).collect();
    for k in 1..=4 {
        let out = conditioner.condition(&frames[k - 1], &settings).unwrap();
        let mut expected = Array2::<f64>::zeros((16, 16));
        for f in &frames[..k] {
            expected += &f.data;
        }
        expected /= k as f64;
        assert_frames_close(&out.frame.data, &expected);
    }
}

#[test]
fn test_window_drops_oldest() {
    let mut settings = settings();
    settings.set_average(2).unwrap();
    let mut conditioner = Conditioner::new();

    let frames: Vec<Frame> = (0..3).map(frame).collect();
    let mut last = None;
    for f in &frames {
        last = conditioner.condition(f, &settings);
    }
    let expected = (&frames[1].data + &frames[2].data) / 2.0;
    assert_frames_close(&last.unwrap().frame.data, &expected);
    assert_eq!(conditioner.window_len(), 2);
}

#[test]
fn test_shrinking_window_to_one_clears() {
    let mut settings = settings();
    settings.set_average(3).unwrap();
    let mut conditioner = Conditioner::new();
    conditioner.condition(&frame(0), &settings);
    conditioner.condition(&frame(1), &settings);
    assert_eq!(conditioner.window_len(), 2);

    settings.set_average(1).unwrap();
    let raw = frame(2);
    let out = conditioner.condition(&raw, &settings).unwrap();
    assert_eq!(out.frame.data, raw.data);
    assert_eq!(conditioner.window_len(), 0);
}

#[test]
fn test_average_window_bounds() {
    let mut settings = settings();
    assert!(settings.set_average(0).is_err());
    assert!(settings.set_average(21).is_err());
    assert!(settings.set_average(20).is_ok());
    assert_eq!(settings.average(), 20);
}

// ---------------------------------------------------------------------------
// Dark frames
// ---------------------------------------------------------------------------

#[test]
fn test_dark_frame_captured_then_subtracted() {
    let mut settings = settings();
    settings.set_dark(true);
    let mut conditioner = Conditioner::new();

    let dark = frame(3);
    assert!(conditioner.condition(&dark, &settings).is_none());
    assert!(conditioner.has_dark());

    let raw = frame(5);
    let out = conditioner.condition(&raw, &settings).unwrap();
    assert_frames_close(&out.frame.data, &(&raw.data - &dark.data));
    // signed result, no clamping
    assert!(out.frame.data.iter().any(|&v| v < 0.0));
}

#[test]
fn test_shutter_change_invalidates_dark() {
    let mut settings = settings();
    settings.set_dark(true);
    let mut conditioner = Conditioner::new();
    conditioner.condition(&frame(3), &settings);
    assert!(conditioner.has_dark());

    settings.set_shutter(2e-3).unwrap();
    assert!(!settings.dark());
    let raw = frame(4);
    let out = conditioner.condition(&raw, &settings).unwrap();
    assert_eq!(out.frame.data, raw.data);
    assert!(!conditioner.has_dark());

    // re-enabling captures a fresh dark frame
    settings.set_dark(true);
    assert!(conditioner.condition(&frame(6), &settings).is_none());
}

#[test]
fn test_gain_change_invalidates_dark() {
    let mut settings = settings();
    settings.set_dark(true);
    settings.set_gain(6.0).unwrap();
    assert!(!settings.dark());
}

#[test]
fn test_rejected_shutter_keeps_value_and_dark() {
    let mut settings = settings();
    settings.set_dark(true);
    let before = settings.shutter();
    assert!(settings.set_shutter(10.0).is_err());
    assert_eq!(settings.shutter(), before);
    assert!(settings.dark());
}

#[test]
fn test_dark_uses_averaged_frame() {
    let mut settings = settings();
    settings.set_average(2).unwrap();
    let mut conditioner = Conditioner::new();
    conditioner.condition(&frame(0), &settings);

    settings.set_dark(true);
    assert!(conditioner.condition(&frame(1), &settings).is_none());
    let dark = (&frame(0).data + &frame(1).data) / 2.0;

    let out = conditioner.condition(&frame(2), &settings).unwrap();
    let averaged = (&frame(1).data + &frame(2).data) / 2.0;
    assert_frames_close(&out.frame.data, &(averaged - dark));
}

// ---------------------------------------------------------------------------
// ROI
// ---------------------------------------------------------------------------

#[test]
fn test_roi_crop() {
    let mut settings = settings();
    settings.set_roi(Roi {
        left: -4.0,
        bottom: -2.0,
        width: 8.0,
        height: 8.0,
    });
    let mut conditioner = Conditioner::new();
    let raw = frame(9);
    let out = conditioner.condition(&raw, &settings).unwrap();
    assert_eq!(out.bounds, PixelBounds { l: 4, b: 6, w: 8, h: 8 });
    assert_eq!(out.frame.data, raw.data.slice(s![6..14, 4..12]).to_owned());
}
