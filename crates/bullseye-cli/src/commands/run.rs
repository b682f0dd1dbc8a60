use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::Args;
use bullseye_core::io::recorder::{FrameSink, PatternRecorder, SerRecorder};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::SourceArgs;
use crate::summary::{beam_line, print_session_summary};

/// Longest gap between snapshots before the run is abandoned.
const SNAPSHOT_TIMEOUT_SECS: u64 = 10;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of snapshots to print
    #[arg(short = 'n', long, default_value = "100")]
    pub frames: u64,

    /// Stop after this many seconds even if fewer frames arrived
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Record raw frames: a .ser path, or an image pattern containing
    /// `{n}` (frame counter) or `{ts}` (unix milliseconds)
    #[arg(short, long)]
    pub record: Option<PathBuf>,
}

fn recorder(path: &Path) -> Box<dyn FrameSink> {
    let pattern = path.to_string_lossy();
    if pattern.contains('{') {
        Box::new(PatternRecorder::new(pattern.into_owned()))
    } else {
        Box::new(SerRecorder::new(path))
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut acquisition = args.source.acquisition()?;
    if let Some(ref path) = args.record {
        acquisition.set_sink(Some(recorder(path)))?;
    }

    print_session_summary(
        &args.source.source,
        &acquisition.settings(),
        &acquisition.process_config(),
        args.record.as_deref(),
    );

    let snapshots = acquisition.subscribe();
    acquisition.start()?;
    info!(frames = args.frames, "acquisition started");

    let pb = ProgressBar::new(args.frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Acquiring");

    let deadline = args
        .seconds
        .map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));
    let timeout = Duration::from_secs(SNAPSHOT_TIMEOUT_SECS);
    let mut received = 0;
    let mut stalled = false;

    while received < args.frames {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match snapshots.recv_timeout(timeout) {
            Ok(snapshot) => {
                received += 1;
                pb.println(beam_line(snapshot.frame_index, &snapshot.metrics));
                pb.inc(1);
            }
            Err(RecvTimeoutError::Timeout) => {
                stalled = true;
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    acquisition.stop()?;
    // Finalizes the recording.
    acquisition.set_sink(None)?;
    pb.finish_with_message("Done");

    if stalled {
        bail!("No frame processed within {SNAPSHOT_TIMEOUT_SECS} s");
    }
    println!("\n  {received} frames processed");
    Ok(())
}
