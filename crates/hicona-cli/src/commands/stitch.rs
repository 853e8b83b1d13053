use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use hicona_core::engine::FijiEngine;
use hicona_core::plate::WellId;
use hicona_core::stitch::{self, StitchConfig};

#[derive(Args)]
pub struct StitchArgs {
    /// Exported well directory (named by its well token, holding ch{N}/
    /// tile directories and the tile configuration)
    pub well_dir: PathBuf,

    /// Fiji launcher
    #[arg(long)]
    pub fiji: PathBuf,

    /// Reference channel for registration (1-based)
    #[arg(long, default_value = "1")]
    pub reference_channel: u32,
}

pub fn run(args: &StitchArgs) -> Result<()> {
    let name = args
        .well_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid well directory {}", args.well_dir.display()))?;
    let well: WellId = name
        .parse()
        .map_err(|_| anyhow!("directory name {name:?} is not a well token (r##c##)"))?;

    let engine = FijiEngine::global(&args.fiji);
    let config = StitchConfig {
        reference_channel: args.reference_channel,
    };
    stitch::stitch_well(engine, &args.well_dir, well, &config)?;

    println!("Stitched {well} into {}", args.well_dir.join("Stitched").display());
    Ok(())
}
