use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::analysis::{BeamMetrics, ProjectionSet};
use crate::capture::settings::lock;
use crate::frame::{Frame, PixelBounds};

/// Immutable result of one processed frame.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Publication counter, starts at 1.
    pub sequence: u64,
    pub frame_index: u64,
    pub metrics: BeamMetrics,
    pub projections: ProjectionSet,
    /// The conditioned frame the metrics were computed from.
    pub image: Frame,
    /// Position of `image` on the sensor.
    pub bounds: PixelBounds,
}

#[derive(Default)]
struct Slot {
    latest: Option<Arc<Snapshot>>,
    sequence: u64,
}

/// Hands snapshots from the worker to any number of readers.
///
/// Readers either poll the single latest slot or subscribe to a bounded
/// queue. Publishing never blocks on a slow subscriber.
#[derive(Default)]
pub struct SnapshotHub {
    slot: Mutex<Slot>,
    changed: Condvar,
    subscribers: Mutex<Vec<SyncSender<Arc<Snapshot>>>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots published so far.
    pub fn sequence(&self) -> u64 {
        lock(&self.slot).sequence
    }

    /// Publish a snapshot, assigning the next sequence number.
    pub fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let published = {
            let mut slot = lock(&self.slot);
            slot.sequence += 1;
            snapshot.sequence = slot.sequence;
            let published = Arc::new(snapshot);
            slot.latest = Some(Arc::clone(&published));
            published
        };
        self.changed.notify_all();

        lock(&self.subscribers).retain(|tx| match tx.try_send(Arc::clone(&published)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(sequence = published.sequence, "subscriber queue full");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        published
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        lock(&self.slot).latest.clone()
    }

    /// Block until a snapshot newer than `after` is published or `timeout`
    /// elapses.
    pub fn wait_newer(&self, after: u64, timeout: Duration) -> Option<Arc<Snapshot>> {
        let deadline = Instant::now() + timeout;
        let mut slot = lock(&self.slot);
        loop {
            if slot.sequence > after {
                return slot.latest.clone();
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            slot = match self.changed.wait_timeout(slot, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Receive every subsequent snapshot through a queue of `depth` entries.
    pub fn subscribe(&self, depth: usize) -> Receiver<Arc<Snapshot>> {
        let (tx, rx) = mpsc::sync_channel(depth.max(1));
        lock(&self.subscribers).push(tx);
        rx
    }
}
