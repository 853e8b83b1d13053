use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use hicona_core::backend::{BackendConfig, CellposeConfig, ImageJMacroConfig};
use hicona_core::pipeline::config::PipelineConfig;
use hicona_core::pipeline::run_pipeline_reported;
use hicona_core::pipeline::types::{PipelineStage, ProgressReporter};
use hicona_core::process::Projection;
use hicona_core::stitch::StitchConfig;

use crate::summary;

#[derive(Args)]
pub struct RunArgs {
    /// Source root holding measurement directories, or a single measurement
    pub source: PathBuf,

    /// Pipeline config file (JSON); command-line flags are ignored when set
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "processed")]
    pub output: PathBuf,

    /// Process only this measurement subdirectory of the source
    #[arg(long)]
    pub measurement: Option<String>,

    /// Z-projection applied to each FOV
    #[arg(long, value_enum, default_value = "none")]
    pub projection: ProjectionArg,

    /// Channel to EDF-project (0-based), for --projection imagej-edf
    #[arg(long, default_value = "0")]
    pub edf_channel: usize,

    /// Convert each image to 8 bit, scaled by its own maximum
    #[arg(long)]
    pub to_8bit: bool,

    /// Export per-channel tiles alongside the hyperstack
    #[arg(long)]
    pub split_channels: bool,

    /// Stitch per-channel tiles into mosaics with Fiji
    #[arg(long)]
    pub stitch: bool,

    /// Reference channel for stitching registration (1-based)
    #[arg(long, default_value = "1")]
    pub reference_channel: u32,

    /// Run Cellpose segmentation after preprocessing/stitching
    #[arg(long)]
    pub cellpose: bool,

    /// Cellpose backend config file (JSON)
    #[arg(long)]
    pub cellpose_config: Option<PathBuf>,

    /// Run this ImageJ macro over the stitched mosaics
    #[arg(long)]
    pub imagej_macro: Option<PathBuf>,

    /// JSON argument file for the ImageJ macro
    #[arg(long)]
    pub imagej_args: Option<PathBuf>,

    /// Fiji launcher (required for EDF, stitching and ImageJ macros)
    #[arg(long)]
    pub fiji: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProjectionArg {
    None,
    Maximum,
    Minimum,
    ImagejEdf,
}

/// Drives one indicatif bar per pipeline stage.
struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let bar = match total_items {
            Some(total) => {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg:24} [{bar:40}] {pos}/{len}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        bar.set_message(stage.to_string());
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn advance(&self, items_done: usize) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            bar.set_position(items_done as u64);
        }
    }

    fn finish_stage(&self) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        serde_json::from_str(&contents).context("Invalid pipeline config")?
    } else {
        build_config_from_args(args)?
    };

    summary::print_run_header(&config);

    let reporter = std::sync::Arc::new(BarReporter::new());
    let run_summary = run_pipeline_reported(&config, reporter)?;

    summary::print_run_summary(&run_summary);

    if run_summary.has_failures() {
        bail!(
            "{} well(s) and {} FOV(s) failed",
            run_summary.wells_failed,
            run_summary.fovs_failed
        );
    }
    Ok(())
}

fn build_config_from_args(args: &RunArgs) -> Result<PipelineConfig> {
    let projection = match args.projection {
        ProjectionArg::None => Projection::None,
        ProjectionArg::Maximum => Projection::Maximum,
        ProjectionArg::Minimum => Projection::Minimum,
        ProjectionArg::ImagejEdf => Projection::ImagejEdf,
    };

    let backend = if let Some(macro_file) = &args.imagej_macro {
        Some(BackendConfig::ImagejMacro(ImageJMacroConfig {
            macro_file: macro_file.clone(),
            args_file: args.imagej_args.clone(),
        }))
    } else if args.cellpose {
        let config = match &args.cellpose_config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&contents).context("Invalid Cellpose config")?
            }
            None => CellposeConfig::default(),
        };
        Some(BackendConfig::Cellpose(config))
    } else {
        None
    };

    Ok(PipelineConfig {
        source: args.source.clone(),
        output: args.output.clone(),
        measurement: args.measurement.clone(),
        projection,
        edf_channel: args.edf_channel,
        convert_to_8bit: args.to_8bit,
        split_channels: args.split_channels,
        stitch: args.stitch.then(|| StitchConfig {
            reference_channel: args.reference_channel,
        }),
        backend,
        fiji: args.fiji.clone(),
    })
}
