use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{BullseyeError, Result};
use crate::frame::{Frame, SensorGeometry};

use super::replay::ReplaySource;
use super::synthetic::{SyntheticConfig, SyntheticSource};

/// Hardware exposure ranges reported by a source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExposureLimits {
    /// Shortest shutter time in seconds.
    pub min_shutter: f64,
    /// Longest shutter time in seconds.
    pub max_shutter: f64,
    pub min_gain: f64,
    pub max_gain: f64,
    /// Highest framerate the device accepts (frames per second).
    pub max_framerate: f64,
}

/// A device (or simulation) that delivers raw intensity frames.
///
/// Sources are driven from a single thread at a time: the acquisition
/// worker while running, the controlling thread otherwise.
pub trait FrameSource: Send {
    /// Human-readable device name.
    fn name(&self) -> &str;

    fn geometry(&self) -> SensorGeometry;

    fn limits(&self) -> ExposureLimits;

    /// Begin streaming.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Stop streaming.
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    /// Take the next frame from the device. May block on hardware I/O.
    fn dequeue(&mut self) -> Result<Frame>;

    /// Return a frame buffer to the device.
    fn enqueue(&mut self, _frame: Frame) {}

    /// Discard frames already queued by the device.
    fn flush(&mut self) {}

    fn shutter(&self) -> f64;
    fn set_shutter(&mut self, seconds: f64) -> Result<()>;

    fn gain(&self) -> f64;
    fn set_gain(&mut self, db: f64) -> Result<()>;

    fn framerate(&self) -> f64;
    fn set_framerate(&mut self, fps: f64) -> Result<()>;
}

/// Source selection, parsed from a `scheme:location` string.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceSpec {
    /// `none:`, a simulated Gaussian beam.
    Synthetic,
    /// `replay:<path>`, cycling through recorded SER frames.
    Replay(PathBuf),
}

impl FromStr for SourceSpec {
    type Err = BullseyeError;

    fn from_str(s: &str) -> Result<Self> {
        let (scheme, location) = s.split_once(':').unwrap_or((s, ""));
        match scheme {
            "none" | "synthetic" => Ok(Self::Synthetic),
            "replay" => {
                let path = location.trim_start_matches("//");
                if path.is_empty() {
                    return Err(BullseyeError::InvalidSource(
                        "replay source needs a path (replay:<file-or-dir>)".into(),
                    ));
                }
                Ok(Self::Replay(PathBuf::from(path)))
            }
            other => Err(BullseyeError::InvalidSource(format!(
                "unknown source scheme '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synthetic => write!(f, "none:"),
            Self::Replay(path) => write!(f, "replay:{}", path.display()),
        }
    }
}

/// Open the source named by `spec`.
pub fn open_source(spec: &SourceSpec) -> Result<Box<dyn FrameSource>> {
    match spec {
        SourceSpec::Synthetic => Ok(Box::new(SyntheticSource::new(SyntheticConfig::default()))),
        SourceSpec::Replay(path) => Ok(Box::new(ReplaySource::open(path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_synthetic() {
        assert_eq!("none:".parse::<SourceSpec>().unwrap(), SourceSpec::Synthetic);
    }

    #[test]
    fn test_parse_replay_with_slashes() {
        let spec: SourceSpec = "replay:///tmp/beam".parse().unwrap();
        assert_eq!(spec, SourceSpec::Replay(PathBuf::from("/tmp/beam")));
    }

    #[test]
    fn test_parse_replay_without_path() {
        assert!("replay:".parse::<SourceSpec>().is_err());
    }

    #[test]
    fn test_parse_unknown_scheme() {
        assert!("dc1394://guid/1".parse::<SourceSpec>().is_err());
    }
}
