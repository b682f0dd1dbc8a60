use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use bullseye_core::io::ser::SerReader;

#[derive(Args)]
pub struct InfoArgs {
    /// SER recording
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let header = &reader.header;

    println!("File:        {}", args.file.display());
    println!("Frames:      {}", reader.frame_count());
    println!("Dimensions:  {}x{}", header.width, header.height);
    println!("Bit depth:   {}", header.pixel_depth);
    println!("Max value:   {}", header.maxval());
    if header.planes_per_pixel() > 1 {
        println!("Planes:      {} (green plane is analyzed)", header.planes_per_pixel());
    }

    for (label, value) in [
        ("Observer:", &header.observer),
        ("Instrument:", &header.instrument),
        ("Telescope:", &header.telescope),
    ] {
        if !value.is_empty() {
            println!("{label:<13}{value}");
        }
    }

    let frame_bytes = header.frame_byte_size().unwrap_or(0);
    let total_mb = (frame_bytes * reader.frame_count()) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}
