use std::sync::Mutex;

use tracing::{debug, warn};

use crate::condition::{auto_expose, ConditionedFrame, Conditioner};
use crate::config::AutoExposureConfig;
use crate::error::Result;
use crate::io::recorder::FrameSink;

use super::settings::{lock, CaptureSettings};
use super::source::FrameSource;

/// A frame source plus everything that happens to its frames before
/// analysis: exposure control, recording, averaging, dark subtraction
/// and ROI cropping.
pub struct Capture {
    source: Box<dyn FrameSource>,
    conditioner: Conditioner,
    sink: Option<Box<dyn FrameSink>>,
    exposure: AutoExposureConfig,
}

impl Capture {
    pub fn new(source: Box<dyn FrameSource>, exposure: AutoExposureConfig) -> Self {
        Self {
            source,
            conditioner: Conditioner::new(),
            sink: None,
            exposure,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        debug!(source = self.source.name(), "starting capture");
        self.source.start()
    }

    pub fn stop(&mut self) -> Result<()> {
        debug!(source = self.source.name(), "stopping capture");
        self.source.stop()
    }

    pub fn exposure_config(&self) -> &AutoExposureConfig {
        &self.exposure
    }

    pub fn set_exposure_config(&mut self, exposure: AutoExposureConfig) {
        self.exposure = exposure;
    }

    /// Install a sink for raw frames, finishing the previous one.
    pub fn set_sink(&mut self, sink: Option<Box<dyn FrameSink>>) -> Result<()> {
        match std::mem::replace(&mut self.sink, sink) {
            Some(old) => old.finish(),
            None => Ok(()),
        }
    }

    /// Acquire and condition one frame.
    ///
    /// `Ok(None)` means the cycle produced nothing to analyze (dark frame
    /// captured). Settings are read under the lock and released before any
    /// device I/O.
    pub fn capture(&mut self, settings: &Mutex<CaptureSettings>) -> Result<Option<ConditionedFrame>> {
        let snapshot = lock(settings).clone();
        self.sync_device(&snapshot)?;

        let mut raw = self.source.dequeue()?;
        let mut current = snapshot;
        if current.auto_exposure() {
            let maxval = current.geometry().maxval;
            raw = auto_expose(self.source.as_mut(), raw, maxval, &self.exposure, |shutter| {
                if let Err(err) = lock(settings).set_shutter(shutter) {
                    warn!("auto exposure chose rejected shutter {shutter}: {err}");
                }
            })?;
            current = lock(settings).clone();
        }

        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.record(&raw, current.geometry()) {
                warn!("failed to record frame {}: {err}", raw.metadata.frame_index);
            }
        }

        let conditioned = self.conditioner.condition(&raw, &current);
        self.source.enqueue(raw);
        Ok(conditioned)
    }

    /// Push changed exposure settings down to the device.
    fn sync_device(&mut self, settings: &CaptureSettings) -> Result<()> {
        if self.source.shutter() != settings.shutter() {
            self.source.set_shutter(settings.shutter())?;
        }
        if self.source.gain() != settings.gain() {
            self.source.set_gain(settings.gain())?;
        }
        if self.source.framerate() != settings.framerate() {
            self.source.set_framerate(settings.framerate())?;
        }
        Ok(())
    }

    /// Finish the sink, if any.
    pub fn finish(&mut self) -> Result<()> {
        self.set_sink(None)
    }
}
