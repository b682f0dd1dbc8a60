//! Frame sources and the capture stage that feeds the analysis.

pub mod device;
pub mod replay;
pub mod settings;
pub mod source;
pub mod synthetic;

pub use device::Capture;
pub use replay::ReplaySource;
pub use settings::CaptureSettings;
pub use source::{open_source, ExposureLimits, FrameSource, SourceSpec};
pub use synthetic::{SyntheticConfig, SyntheticSource};
