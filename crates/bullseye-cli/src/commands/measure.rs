use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use bullseye_core::io::image_io::save_frame;

use super::SourceArgs;
use crate::summary::{print_session_summary, print_snapshot};

#[derive(Args)]
pub struct MeasureArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Save the conditioned frame (.tif or .png)
    #[arg(long)]
    pub save: Option<PathBuf>,
}

pub fn run(args: &MeasureArgs) -> Result<()> {
    let mut acquisition = args.source.acquisition()?;
    print_session_summary(
        &args.source.source,
        &acquisition.settings(),
        &acquisition.process_config(),
        None,
    );

    let Some(snapshot) = acquisition.initialize()? else {
        bail!("No frame was analyzed (dark frame capture consumed every attempt)");
    };
    print_snapshot(&snapshot);

    if let Some(ref path) = args.save {
        let maxval = acquisition.geometry().maxval;
        save_frame(&snapshot.image, maxval, path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        println!("  Frame saved to {}", path.display());
    }

    Ok(())
}
