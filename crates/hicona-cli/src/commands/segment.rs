use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hicona_core::backend::{AnalysisBackend, CellposeBackend, CellposeConfig};
use hicona_core::plate::WellId;
use tracing::error;

#[derive(Args)]
pub struct SegmentArgs {
    /// Processed measurement output root (holding per-well directories)
    pub dir: PathBuf,

    /// Cellpose backend config file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &SegmentArgs) -> Result<()> {
    let config: CellposeConfig = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).context("Invalid Cellpose config")?
        }
        None => CellposeConfig::default(),
    };
    let mut backend = CellposeBackend::new(config);

    let mut wells: Vec<(WellId, PathBuf)> = std::fs::read_dir(&args.dir)
        .with_context(|| format!("Failed to read {}", args.dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            e.file_name()
                .to_string_lossy()
                .parse::<WellId>()
                .ok()
                .map(|well| (well, e.path()))
        })
        .collect();
    wells.sort_by_key(|(well, _)| *well);
    anyhow::ensure!(!wells.is_empty(), "no well directories under {}", args.dir.display());

    let mut failed = 0usize;
    for (well, well_dir) in &wells {
        println!("Segmenting well {well}");
        if let Err(e) = backend.run_well(well_dir, *well) {
            error!(well = %well, error = %e, "Segmentation failed");
            failed += 1;
        }
    }
    backend.finish(&args.dir)?;

    println!("Segmented {} well(s)", wells.len() - failed);
    anyhow::ensure!(failed == 0, "{failed} well(s) failed");
    Ok(())
}
