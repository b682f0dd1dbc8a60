pub mod snapshot;
pub mod worker;

pub use snapshot::{Snapshot, SnapshotHub};
pub use worker::{AcquisitionLoop, LoopState};
