//! Beam analysis: moments, crop convergence, Gaussian fit and projections.

pub mod crop;
pub mod metrics;
pub mod moments;
pub mod projection;
pub mod stats;
pub mod sums;

pub use crop::{converge, CropResult};
pub use metrics::{analyze, Analysis, BeamMetrics};
pub use moments::{gaussian_fit, moments, FitQuality, GaussianFit, Moments};
pub use projection::{AxisTicks, Markers, Polyline, ProjectionSet};
