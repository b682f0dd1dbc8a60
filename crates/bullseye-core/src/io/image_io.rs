use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};

use crate::error::{BullseyeError, Result};
use crate::frame::Frame;

fn normalized(v: f64, maxval: f64) -> f64 {
    (v / maxval).clamp(0.0, 1.0)
}

/// Save a frame as 16-bit grayscale TIFF, scaling `maxval` to full range.
pub fn save_tiff(frame: &Frame, maxval: u32, path: &Path) -> Result<()> {
    let (h, w) = (frame.height(), frame.width());
    let maxval = maxval.max(1) as f64;
    let pixels: Vec<u16> = frame
        .data
        .iter()
        .map(|&v| (normalized(v, maxval) * 65535.0) as u16)
        .collect();

    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or(BullseyeError::InvalidDimensions {
            width: w as u32,
            height: h as u32,
        })?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a frame as 8-bit grayscale PNG, scaling `maxval` to full range.
pub fn save_png(frame: &Frame, maxval: u32, path: &Path) -> Result<()> {
    let (h, w) = (frame.height(), frame.width());
    let maxval = maxval.max(1) as f64;

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in frame.data.indexed_iter() {
        let val = (normalized(v, maxval) * 255.0) as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save frame, choosing format from file extension (TIFF by default).
pub fn save_frame(frame: &Frame, maxval: u32, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(frame, maxval, path),
        _ => save_tiff(frame, maxval, path),
    }
}
