use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hicona_core::backend::{BackendConfig, CellposeConfig};
use hicona_core::pipeline::config::PipelineConfig;
use hicona_core::process::Projection;
use hicona_core::stitch::StitchConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full default PipelineConfig as JSON, with every
/// optional stage populated so the document shows all the knobs.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = PipelineConfig {
        source: PathBuf::from("measurements"),
        output: PathBuf::from("processed"),
        projection: Projection::Maximum,
        split_channels: true,
        stitch: Some(StitchConfig::default()),
        backend: Some(BackendConfig::Cellpose(CellposeConfig::default())),
        fiji: Some(PathBuf::from("Fiji.app/ImageJ-linux64")),
        ..PipelineConfig::default()
    };
    let json = serde_json::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}
