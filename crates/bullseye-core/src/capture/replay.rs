use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BullseyeError, Result};
use crate::frame::{Frame, SensorGeometry};
use crate::io::ser::SerReader;

use super::source::{ExposureLimits, FrameSource};

/// Replays recorded SER frames in a loop.
///
/// Exposure settings are accepted and reported back but have no effect
/// on the recorded data.
pub struct ReplaySource {
    name: String,
    readers: Vec<SerReader>,
    geometry: SensorGeometry,
    file: usize,
    frame: usize,
    served: u64,
    shutter: f64,
    gain: f64,
    framerate: f64,
}

impl ReplaySource {
    /// Open a single SER file, or every `*.ser` file of a directory in name order.
    pub fn open(path: &Path) -> Result<Self> {
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("ser"))
                .collect();
            paths.sort();
            paths
        } else {
            vec![path.to_path_buf()]
        };

        let mut readers = Vec::with_capacity(paths.len());
        for p in &paths {
            let reader = SerReader::open(p)?;
            if reader.frame_count() == 0 {
                debug!(path = %p.display(), "skipping empty SER file");
                continue;
            }
            readers.push(reader);
        }

        let first = readers.first().ok_or(BullseyeError::EmptySequence)?;
        let geometry = first.geometry(1.0);
        if let Some(odd) = readers.iter().find(|r| {
            r.header.width as usize != geometry.width || r.header.height as usize != geometry.height
        }) {
            return Err(BullseyeError::InvalidDimensions {
                width: odd.header.width,
                height: odd.header.height,
            });
        }

        Ok(Self {
            name: format!("replay:{}", path.display()),
            readers,
            geometry,
            file: 0,
            frame: 0,
            served: 0,
            shutter: 1e-3,
            gain: 0.0,
            framerate: 10.0,
        })
    }

    /// Physical pixel size to report (SER files do not record it).
    pub fn with_pixel_size(mut self, pixel_size: f64) -> Self {
        self.geometry.pixel_size = pixel_size;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.readers.iter().map(SerReader::frame_count).sum()
    }
}

impl FrameSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn geometry(&self) -> SensorGeometry {
        self.geometry
    }

    fn limits(&self) -> ExposureLimits {
        ExposureLimits {
            min_shutter: 1e-5,
            max_shutter: 0.1,
            min_gain: 0.0,
            max_gain: 24.0,
            max_framerate: 10.0,
        }
    }

    fn dequeue(&mut self) -> Result<Frame> {
        let reader = &self.readers[self.file];
        let mut frame = reader.read_frame(self.frame)?;
        frame.metadata.frame_index = self.served;
        self.served += 1;

        self.frame += 1;
        if self.frame >= reader.frame_count() {
            self.frame = 0;
            self.file = (self.file + 1) % self.readers.len();
        }
        Ok(frame)
    }

    fn shutter(&self) -> f64 {
        self.shutter
    }

    fn set_shutter(&mut self, seconds: f64) -> Result<()> {
        self.shutter = seconds;
        Ok(())
    }

    fn gain(&self) -> f64 {
        self.gain
    }

    fn set_gain(&mut self, db: f64) -> Result<()> {
        self.gain = db;
        Ok(())
    }

    fn framerate(&self) -> f64 {
        self.framerate
    }

    fn set_framerate(&mut self, fps: f64) -> Result<()> {
        self.framerate = fps;
        Ok(())
    }
}
