/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum ROI extent in pixels on each axis.
pub const MIN_ROI_PIXELS: usize = 8;

/// Upper bound of the temporal averaging window.
pub const MAX_AVERAGE_WINDOW: usize = 20;

/// Lower bound of the framerate range (frames per second).
pub const MIN_FRAMERATE: f64 = 1.0;

/// Default number of moment/crop passes per frame.
pub const DEFAULT_CROP_ITERATIONS: usize = 3;

/// Default crop radius in beam diameters.
pub const DEFAULT_CROP_RADIUS: f64 = 1.5;

/// Default fraction of total intensity ignored when cropping on encircled energy.
pub const DEFAULT_IGNORE_FRACTION: f64 = 0.01;

/// Upper bound of the ignore fraction.
pub const MAX_IGNORE_FRACTION: f64 = 0.5;

/// Minimum crop half-width in pixels.
pub const MIN_CROP_HALF_WIDTH: f64 = 4.0;

/// Total intensity, in full-scale pixels, at or below which a frame is
/// reported as low signal.
pub const LOW_SIGNAL_FULL_SCALE: f64 = 1.0;

/// Percentile of the raw frame regulated by auto-exposure.
pub const DEFAULT_EXPOSURE_PERCENTILE: f64 = 99.9;

/// Maximum number of shutter adjustments per auto-exposure cycle.
pub const DEFAULT_EXPOSURE_MAX_ITERATIONS: usize = 10;

/// Lower edge of the accepted exposure band (fraction of maxval).
pub const DEFAULT_EXPOSURE_LOW: f64 = 0.25;

/// Upper edge of the accepted exposure band (fraction of maxval).
pub const DEFAULT_EXPOSURE_HIGH: f64 = 0.75;

/// Multiplicative shutter step; shutter is multiplied to darken, divided to brighten.
pub const DEFAULT_EXPOSURE_ADJUSTMENT: f64 = 0.5;

/// Number of points on each marker ellipse.
pub const ELLIPSE_POINTS: usize = 41;

/// How long `stop()` waits for the worker before reporting a lifecycle fault.
pub const STOP_TIMEOUT_SECS: u64 = 5;

/// Poll interval while waiting for the worker to finish.
pub const STOP_POLL_MILLIS: u64 = 5;

/// Pause before retrying after the source failed to deliver a frame.
pub const ACQUISITION_RETRY_MILLIS: u64 = 10;

/// Conditioning cycles `initialize()` runs before giving up on a frame
/// (the first may be consumed by dark-frame capture).
pub const INITIALIZE_ATTEMPTS: usize = 2;

/// Capacity of each snapshot subscriber queue.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 4;

/// Default sensor geometry of the synthetic source.
pub const SYNTHETIC_WIDTH: usize = 640;
pub const SYNTHETIC_HEIGHT: usize = 480;
