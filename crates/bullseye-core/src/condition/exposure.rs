use ndarray::ArrayView2;
use tracing::{debug, warn};

use crate::analysis::stats::percentile;
use crate::capture::{ExposureLimits, FrameSource};
use crate::config::AutoExposureConfig;
use crate::error::Result;
use crate::frame::Frame;

/// Brightness of a frame as the given percentile over full scale.
pub fn exposure_level(data: ArrayView2<f64>, pct: f64, maxval: u32) -> f64 {
    percentile(data, pct) / f64::from(maxval.max(1))
}

/// Direction the controller wants to move the shutter in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Hold,
    Shorter,
    Longer,
}

fn next_step(level: f64, shutter: f64, config: &AutoExposureConfig, limits: &ExposureLimits) -> Step {
    if level > config.high && shutter > limits.min_shutter {
        Step::Shorter
    } else if level < config.low && shutter < limits.max_shutter {
        Step::Longer
    } else {
        Step::Hold
    }
}

/// Drive the shutter until the frame brightness lands inside the target band.
///
/// Returns the last frame observed (the input frame when no adjustment was
/// needed). The device framerate is raised to its maximum for the duration
/// of the search and restored afterwards; every committed shutter value is
/// reported through `commit` so the caller can mirror it.
pub fn auto_expose(
    source: &mut dyn FrameSource,
    frame: Frame,
    maxval: u32,
    config: &AutoExposureConfig,
    mut commit: impl FnMut(f64),
) -> Result<Frame> {
    let limits = source.limits();
    let level = exposure_level(frame.data.view(), config.percentile, maxval);
    if next_step(level, source.shutter(), config, &limits) == Step::Hold {
        return Ok(frame);
    }

    let framerate = source.framerate();
    source.set_framerate(limits.max_framerate)?;
    let result = search(source, frame, maxval, config, &limits, &mut commit);
    if let Err(err) = source.set_framerate(framerate) {
        warn!("could not restore framerate {framerate}: {err}");
    }
    result
}

fn search(
    source: &mut dyn FrameSource,
    mut frame: Frame,
    maxval: u32,
    config: &AutoExposureConfig,
    limits: &ExposureLimits,
    commit: &mut impl FnMut(f64),
) -> Result<Frame> {
    for _ in 0..config.max_iterations {
        source.enqueue(frame);
        source.flush();
        frame = source.dequeue()?;

        let level = exposure_level(frame.data.view(), config.percentile, maxval);
        let shutter = source.shutter();
        let step = next_step(level, shutter, config, limits);
        let next = match step {
            Step::Hold => {
                debug!(level, shutter, "exposure settled");
                break;
            }
            Step::Shorter => (shutter * config.adjustment).max(limits.min_shutter),
            Step::Longer => (shutter / config.adjustment).min(limits.max_shutter),
        };
        debug!(level, shutter = next, ?step, "exposure adjusted");
        source.set_shutter(next)?;
        commit(next);

        // Drop any frame still exposed with the old shutter.
        source.enqueue(frame);
        frame = source.dequeue()?;
    }
    Ok(frame)
}
