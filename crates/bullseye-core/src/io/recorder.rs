//! Persistence hooks for raw frames.
//!
//! A [`FrameSink`] sees every raw frame right after it is dequeued and
//! before its buffer goes back to the source.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::Result;
use crate::frame::{Frame, SensorGeometry};

use super::image_io::save_frame;
use super::ser::SerHeader;
use super::ser_writer::SerWriter;

pub trait FrameSink: Send {
    fn record(&mut self, frame: &Frame, geometry: &SensorGeometry) -> Result<()>;

    /// Flush anything buffered. Called when the sink is detached.
    fn finish(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Appends every frame to a single SER file.
pub struct SerRecorder {
    path: PathBuf,
    writer: Option<SerWriter>,
}

impl SerRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }
}

impl FrameSink for SerRecorder {
    fn record(&mut self, frame: &Frame, geometry: &SensorGeometry) -> Result<()> {
        if self.writer.is_none() {
            let header = SerHeader::mono(
                frame.width() as u32,
                frame.height() as u32,
                bit_depth_for(geometry.maxval),
            );
            self.writer = Some(SerWriter::create(&self.path, &header)?);
        }
        match self.writer.as_mut() {
            Some(writer) => writer.write_frame(frame),
            None => Ok(()),
        }
    }

    fn finish(self: Box<Self>) -> Result<()> {
        if let Some(writer) = self.writer {
            let count = writer.frames_written();
            writer.finalize()?;
            debug!(path = %self.path.display(), frames = count, "SER recording closed");
        }
        Ok(())
    }
}

/// Writes each frame to its own file.
///
/// The pattern may contain `{n}` (zero-padded frame counter) and `{ts}`
/// (unix milliseconds). The extension selects the format: `.ser`, `.png`,
/// anything else is written as TIFF.
pub struct PatternRecorder {
    pattern: String,
    counter: u64,
}

impl PatternRecorder {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            counter: 0,
        }
    }

    pub fn path_for(&self, counter: u64, unix_ms: u128) -> PathBuf {
        PathBuf::from(
            self.pattern
                .replace("{n}", &format!("{counter:06}"))
                .replace("{ts}", &unix_ms.to_string()),
        )
    }
}

impl FrameSink for PatternRecorder {
    fn record(&mut self, frame: &Frame, geometry: &SensorGeometry) -> Result<()> {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let path = self.path_for(self.counter, unix_ms);
        self.counter += 1;

        if path.extension().and_then(|e| e.to_str()) == Some("ser") {
            write_single_ser(&path, frame, geometry)?;
        } else {
            save_frame(frame, geometry.maxval, &path)?;
        }
        debug!(path = %path.display(), "saved frame");
        Ok(())
    }
}

fn write_single_ser(path: &Path, frame: &Frame, geometry: &SensorGeometry) -> Result<()> {
    let header = SerHeader::mono(
        frame.width() as u32,
        frame.height() as u32,
        bit_depth_for(geometry.maxval),
    );
    let mut writer = SerWriter::create(path, &header)?;
    writer.write_frame(frame)?;
    writer.finalize()
}

/// Smallest bit depth that holds `maxval`.
fn bit_depth_for(maxval: u32) -> u32 {
    (u32::BITS - maxval.leading_zeros()).clamp(1, 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_depth_for() {
        assert_eq!(bit_depth_for(255), 8);
        assert_eq!(bit_depth_for(4095), 12);
        assert_eq!(bit_depth_for(65535), 16);
    }

    #[test]
    fn test_pattern_substitution() {
        let rec = PatternRecorder::new("beam_{n}_{ts}.png");
        assert_eq!(
            rec.path_for(7, 1234),
            PathBuf::from("beam_000007_1234.png")
        );
    }
}
