//! The background capture-and-process loop and its lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::analysis::analyze;
use crate::capture::settings::lock;
use crate::capture::{Capture, CaptureSettings, FrameSource};
use crate::condition::ConditionedFrame;
use crate::config::{AutoExposureConfig, BullseyeConfig, ProcessConfig};
use crate::consts::{
    ACQUISITION_RETRY_MILLIS, INITIALIZE_ATTEMPTS, STOP_POLL_MILLIS, STOP_TIMEOUT_SECS,
    SUBSCRIBER_QUEUE_DEPTH,
};
use crate::error::{BullseyeError, Result};
use crate::frame::{Roi, SensorGeometry};
use crate::io::recorder::FrameSink;

use super::snapshot::{Snapshot, SnapshotHub};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    /// A stop timed out; the worker may still be alive.
    Stopping,
}

/// State shared with the worker thread.
///
/// Locks are taken one at a time, never nested, except `capture` which may
/// take `settings` while held.
struct Shared {
    capture: Mutex<Capture>,
    settings: Mutex<CaptureSettings>,
    process: Mutex<ProcessConfig>,
    hub: SnapshotHub,
    active: AtomicBool,
}

/// Drives source → conditioning → analysis → publication, either once
/// ([`initialize`](Self::initialize)) or continuously on a worker thread.
pub struct AcquisitionLoop {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    state: LoopState,
    geometry: SensorGeometry,
    stop_timeout: Duration,
}

impl AcquisitionLoop {
    pub fn new(source: Box<dyn FrameSource>, config: &BullseyeConfig) -> Result<Self> {
        let config = config.clone().validated()?;
        let mut settings = CaptureSettings::for_source(source.as_ref());
        settings.apply(&config.capture)?;
        let geometry = *settings.geometry();
        info!(
            source = source.name(),
            width = geometry.width,
            height = geometry.height,
            "acquisition ready"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                capture: Mutex::new(Capture::new(source, config.exposure)),
                settings: Mutex::new(settings),
                process: Mutex::new(config.process),
                hub: SnapshotHub::new(),
                active: AtomicBool::new(false),
            }),
            worker: None,
            state: LoopState::Idle,
            geometry,
            stop_timeout: Duration::from_secs(STOP_TIMEOUT_SECS),
        })
    }

    /// Override the join timeout used by [`stop`](Self::stop).
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn geometry(&self) -> SensorGeometry {
        self.geometry
    }

    /// Current lifecycle state. A worker that exited on its own counts as idle.
    pub fn state(&self) -> LoopState {
        match &self.worker {
            Some(handle) if handle.is_finished() => LoopState::Idle,
            None => LoopState::Idle,
            Some(_) => self.state,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Process a single frame synchronously while idle.
    ///
    /// Returns `None` when every attempt was consumed without a frame to
    /// analyze (dark-frame capture).
    pub fn initialize(&mut self) -> Result<Option<Arc<Snapshot>>> {
        if self.is_running() {
            return Err(BullseyeError::WorkerAlreadyRunning);
        }
        let mut capture = lock(&self.shared.capture);
        capture.start()?;
        let mut conditioned = Ok(None);
        for _ in 0..INITIALIZE_ATTEMPTS {
            conditioned = capture.capture(&self.shared.settings);
            if !matches!(conditioned, Ok(None)) {
                break;
            }
        }
        let stopped = capture.stop();
        drop(capture);

        let published = match conditioned? {
            Some(frame) => Some(process_frame(&self.shared, frame)),
            None => None,
        };
        stopped?;
        Ok(published)
    }

    /// Spawn the worker.
    ///
    /// Rejected while a previous worker is still alive; a finished one is
    /// reaped first.
    pub fn start(&mut self) -> Result<()> {
        if let Some(handle) = self.worker.take() {
            if !handle.is_finished() {
                warn!("already have a capture thread running");
                self.worker = Some(handle);
                return Err(BullseyeError::WorkerAlreadyRunning);
            }
            if handle.join().is_err() {
                warn!("previous capture thread crashed");
            } else {
                debug!("reaped previous capture thread");
            }
        }

        self.shared.active.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("bullseye-capture".into())
            .spawn(move || run(&shared));
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.state = LoopState::Running;
                info!("acquisition started");
                Ok(())
            }
            Err(err) => {
                self.shared.active.store(false, Ordering::SeqCst);
                self.state = LoopState::Idle;
                Err(err.into())
            }
        }
    }

    /// Ask the worker to finish and wait up to the stop timeout.
    ///
    /// On timeout the loop stays in [`LoopState::Stopping`] and keeps the
    /// handle; calling `stop` again waits once more.
    pub fn stop(&mut self) -> Result<()> {
        self.shared.active.store(false, Ordering::SeqCst);
        let Some(handle) = self.worker.take() else {
            self.state = LoopState::Idle;
            return Ok(());
        };

        let deadline = Instant::now() + self.stop_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("capture thread did not terminate");
                self.worker = Some(handle);
                self.state = LoopState::Stopping;
                return Err(BullseyeError::StopTimeout {
                    timeout: self.stop_timeout,
                });
            }
            thread::sleep(Duration::from_millis(STOP_POLL_MILLIS));
        }

        self.state = LoopState::Idle;
        match handle.join() {
            Ok(()) => {
                info!("acquisition stopped");
                Ok(())
            }
            Err(_) => {
                warn!("capture thread crashed");
                Err(BullseyeError::WorkerPanicked)
            }
        }
    }

    pub fn settings(&self) -> CaptureSettings {
        lock(&self.shared.settings).clone()
    }

    pub fn process_config(&self) -> ProcessConfig {
        lock(&self.shared.process).clone()
    }

    pub fn set_process_config(&self, config: ProcessConfig) -> Result<()> {
        let config = config.validated()?;
        *lock(&self.shared.process) = config;
        Ok(())
    }

    pub fn exposure_config(&self) -> AutoExposureConfig {
        lock(&self.shared.capture).exposure_config().clone()
    }

    /// Replace the auto-exposure parameters; applies from the next frame.
    pub fn set_exposure_config(&self, config: AutoExposureConfig) -> Result<()> {
        let config = config.validated()?;
        lock(&self.shared.capture).set_exposure_config(config);
        Ok(())
    }

    pub fn set_track(&self, track: bool) {
        lock(&self.shared.process).track = track;
    }

    pub fn set_shutter(&self, seconds: f64) -> Result<()> {
        lock(&self.shared.settings).set_shutter(seconds)
    }

    pub fn set_gain(&self, db: f64) -> Result<()> {
        lock(&self.shared.settings).set_gain(db)
    }

    pub fn set_framerate(&self, fps: f64) -> Result<()> {
        lock(&self.shared.settings).set_framerate(fps)
    }

    pub fn set_average(&self, frames: usize) -> Result<()> {
        lock(&self.shared.settings).set_average(frames)
    }

    pub fn set_auto_exposure(&self, enabled: bool) {
        lock(&self.shared.settings).set_auto_exposure(enabled);
    }

    pub fn set_dark(&self, enabled: bool) {
        lock(&self.shared.settings).set_dark(enabled);
    }

    pub fn set_roi(&self, roi: Roi) {
        lock(&self.shared.settings).set_roi(roi);
    }

    /// Replace the raw-frame sink; the previous sink is finished.
    pub fn set_sink(&self, sink: Option<Box<dyn FrameSink>>) -> Result<()> {
        lock(&self.shared.capture).set_sink(sink)
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.shared.hub.latest()
    }

    /// Block until a snapshot with a sequence number above `after` exists.
    pub fn wait_for_snapshot(&self, after: u64, timeout: Duration) -> Option<Arc<Snapshot>> {
        self.shared.hub.wait_newer(after, timeout)
    }

    pub fn subscribe(&self) -> Receiver<Arc<Snapshot>> {
        self.shared.hub.subscribe(SUBSCRIBER_QUEUE_DEPTH)
    }
}

impl Drop for AcquisitionLoop {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.stop() {
                warn!("acquisition did not shut down cleanly: {err}");
            }
        }
        // A stuck worker may still hold the capture.
        if self.worker.is_some() {
            return;
        }
        if let Err(err) = lock(&self.shared.capture).finish() {
            warn!("failed to finish frame sink: {err}");
        }
    }
}

/// Worker body: one source start/stop bracketing the frame loop.
fn run(shared: &Shared) {
    debug!("start");
    if let Err(err) = lock(&shared.capture).start() {
        warn!("failed to start capture: {err}");
        shared.active.store(false, Ordering::SeqCst);
        return;
    }

    while shared.active.load(Ordering::SeqCst) {
        let captured = lock(&shared.capture).capture(&shared.settings);
        match captured {
            Ok(Some(frame)) => {
                process_frame(shared, frame);
            }
            Ok(None) => continue,
            Err(err) => {
                warn!("acquisition failed, retrying: {err}");
                thread::sleep(Duration::from_millis(ACQUISITION_RETRY_MILLIS));
            }
        }
    }

    debug!("stop");
    if let Err(err) = lock(&shared.capture).stop() {
        warn!("failed to stop capture: {err}");
    }
}

/// Analyze, publish and optionally track one conditioned frame.
fn process_frame(shared: &Shared, conditioned: ConditionedFrame) -> Arc<Snapshot> {
    let geometry = *lock(&shared.settings).geometry();
    let config = lock(&shared.process).clone();
    let analysis = analyze(&conditioned, &geometry, &config);

    let metrics = analysis.metrics;
    let published = shared.hub.publish(Snapshot {
        sequence: 0,
        frame_index: conditioned.frame.metadata.frame_index,
        metrics,
        projections: analysis.projections,
        image: conditioned.frame,
        bounds: conditioned.bounds,
    });

    if config.track && metrics.is_valid() {
        lock(&shared.settings).recenter_roi(metrics.x, metrics.y);
    }
    published
}
