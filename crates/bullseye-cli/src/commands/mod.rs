pub mod config;
pub mod info;
pub mod measure;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use bullseye_core::acquisition::AcquisitionLoop;
use bullseye_core::capture::{open_source, FrameSource, ReplaySource, SourceSpec};
use bullseye_core::config::BullseyeConfig;

/// Source and engine options shared by `run` and `measure`.
#[derive(Args)]
pub struct SourceArgs {
    /// Frame source: `none:` (simulated beam) or `replay:<file-or-dir>`
    #[arg(short, long, default_value = "none:")]
    pub source: String,

    /// Engine config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Pixel size in µm for replayed recordings
    #[arg(long)]
    pub pixel_size: Option<f64>,

    /// Shutter time in seconds
    #[arg(long)]
    pub shutter: Option<f64>,

    /// Gain in dB
    #[arg(long)]
    pub gain: Option<f64>,

    /// Frames to average (1-20)
    #[arg(long)]
    pub average: Option<usize>,

    /// Regulate the shutter automatically
    #[arg(long)]
    pub auto: bool,

    /// Capture and subtract a dark frame
    #[arg(long)]
    pub dark: bool,

    /// Fraction of energy to ignore when cropping (0 = sigma crop)
    #[arg(long)]
    pub ignore: Option<f64>,

    /// Background percentile to subtract, as a fraction
    #[arg(long)]
    pub background: Option<f64>,

    /// Move the ROI along with the beam
    #[arg(long)]
    pub track: bool,
}

impl SourceArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn config(&self) -> Result<BullseyeConfig> {
        let mut config: BullseyeConfig = match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str(&contents).context("Invalid engine config")?
            }
            None => BullseyeConfig::default(),
        };

        let capture = &mut config.capture;
        capture.shutter = self.shutter.or(capture.shutter);
        capture.gain = self.gain.or(capture.gain);
        capture.average = self.average.unwrap_or(capture.average);
        capture.auto_exposure |= self.auto;
        capture.dark |= self.dark;

        let process = &mut config.process;
        process.ignore = self.ignore.unwrap_or(process.ignore);
        process.background = self.background.unwrap_or(process.background);
        process.track |= self.track;

        config.validated().context("Invalid engine config")
    }

    pub fn open(&self) -> Result<Box<dyn FrameSource>> {
        let spec: SourceSpec = self.source.parse()?;
        let source: Box<dyn FrameSource> = match (&spec, self.pixel_size) {
            (SourceSpec::Replay(path), Some(px)) => Box::new(
                ReplaySource::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?
                    .with_pixel_size(px),
            ),
            _ => open_source(&spec).with_context(|| format!("Failed to open source {spec}"))?,
        };
        Ok(source)
    }

    /// Open the source and build the engine around it.
    pub fn acquisition(&self) -> Result<AcquisitionLoop> {
        let config = self.config()?;
        let source = self.open()?;
        Ok(AcquisitionLoop::new(source, &config)?)
    }
}
