//! Cellpose segmentation backend.
//!
//! Invokes the `cellpose` CLI per image, measuring wall-clock time around
//! the call and parsing the estimated cell diameter from its output. A
//! failed segmentation writes a small dummy mask next to the image (a lab
//! convention so downstream tooling always finds a mask file) and records
//! no metric row.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Instant;

use image::{GrayImage, Luma};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::{DUMMY_MASK_OFFSET, DUMMY_MASK_SIZE, STITCHED_DIR};
use crate::error::{HiconaError, Result};
use crate::io;
use crate::metrics::{self, MetricRow};
use crate::naming;
use crate::plate::WellId;

use super::AnalysisBackend;

/// Which images of a well to segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessTarget {
    /// The stitched mosaic of the segmentation channel.
    #[default]
    StitchedImage,
    /// Every exported tile of the segmentation channel.
    EachFov,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CellposeConfig {
    /// Cellpose executable; resolved through PATH by default.
    pub executable: PathBuf,
    pub model: String,
    /// 0 = let the model estimate the diameter.
    pub diameter: f64,
    /// Segmentation channel, 1-based.
    pub channel: u32,
    pub flow_threshold: f64,
    pub cellprob_threshold: f64,
    /// 0 = the model default.
    pub niter: u32,
    pub batch_size: u32,
    pub process: ProcessTarget,
}

impl Default for CellposeConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("cellpose"),
            model: "cyto3".into(),
            diameter: 0.0,
            channel: 1,
            flow_threshold: 0.4,
            cellprob_threshold: 0.0,
            niter: 0,
            batch_size: 64,
            process: ProcessTarget::StitchedImage,
        }
    }
}

fn diameter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"estimated cell diameter.*?(\d+(?:\.\d+)?)\s*$").unwrap())
}

/// Parse the estimated diameter from the CLI output, 0.0 when absent.
pub fn parse_estimated_diameter(output: &str) -> f64 {
    output
        .lines()
        .filter_map(|line| diameter_regex().captures(line))
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .next_back()
        .unwrap_or(0.0)
}

pub struct CellposeBackend {
    config: CellposeConfig,
    rows: Vec<MetricRow>,
}

impl CellposeBackend {
    pub fn new(config: CellposeConfig) -> Self {
        Self {
            config,
            rows: Vec::new(),
        }
    }

    /// Images to segment for one well, per the configured process target.
    fn target_images(&self, well_dir: &Path, well: WellId) -> Result<Vec<PathBuf>> {
        match self.config.process {
            ProcessTarget::StitchedImage => {
                let stitched = well_dir.join(STITCHED_DIR);
                let wanted = naming::mosaic_name(well, self.config.channel);
                let path = stitched.join(&wanted);
                if !path.is_file() {
                    return Err(HiconaError::MissingFile {
                        dir: stitched,
                        expected: wanted,
                    });
                }
                Ok(vec![path])
            }
            ProcessTarget::EachFov => {
                let channel_dir = well_dir.join(naming::channel_dir_name(self.config.channel));
                let mut images: Vec<PathBuf> = std::fs::read_dir(&channel_dir)
                    .map_err(|_| HiconaError::MissingFile {
                        dir: well_dir.to_path_buf(),
                        expected: naming::channel_dir_name(self.config.channel),
                    })?
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("tif"))
                    .collect();
                images.sort();
                Ok(images)
            }
        }
    }

    fn segment_image(&mut self, image_path: &Path) -> Result<()> {
        let start = Instant::now();
        let output = Command::new(&self.config.executable)
            .arg("--image_path")
            .arg(image_path)
            .arg("--pretrained_model")
            .arg(&self.config.model)
            .arg("--diameter")
            .arg(self.config.diameter.to_string())
            .arg("--flow_threshold")
            .arg(self.config.flow_threshold.to_string())
            .arg("--cellprob_threshold")
            .arg(self.config.cellprob_threshold.to_string())
            .arg("--niter")
            .arg(self.config.niter.to_string())
            .arg("--batch_size")
            .arg(self.config.batch_size.to_string())
            .arg("--save_tif")
            .arg("--verbose")
            .output()?;
        let elapsed = start.elapsed().as_secs_f64();

        if !output.status.success() {
            return Err(HiconaError::ExternalTool {
                tool: "cellpose".into(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let combined = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let diameter = parse_estimated_diameter(&combined);
        info!(
            image = %image_path.display(),
            diameter,
            seconds = elapsed,
            "Cellpose segmentation finished"
        );

        self.rows.push(MetricRow {
            filename: image_path.to_string_lossy().into_owned(),
            estimated_diameter: diameter,
            processing_time_s: elapsed,
        });
        Ok(())
    }
}

/// Write a zeroed mask with a small foreground square next to `image_path`,
/// matching its dimensions, as `<stem>_dummy_mask.tif`.
pub fn write_dummy_mask(image_path: &Path) -> Result<PathBuf> {
    let plane = io::load_plane(image_path)?;
    let (h, w) = (plane.nrows() as u32, plane.ncols() as u32);

    let mut mask = GrayImage::new(w, h);
    for y in DUMMY_MASK_OFFSET..(DUMMY_MASK_OFFSET + DUMMY_MASK_SIZE).min(h) {
        for x in DUMMY_MASK_OFFSET..(DUMMY_MASK_OFFSET + DUMMY_MASK_SIZE).min(w) {
            mask.put_pixel(x, y, Luma([1u8]));
        }
    }

    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".into());
    let mask_path = image_path.with_file_name(format!("{stem}_dummy_mask.tif"));
    mask.save(&mask_path)?;
    Ok(mask_path)
}

impl AnalysisBackend for CellposeBackend {
    fn name(&self) -> &'static str {
        "cellpose"
    }

    fn run_well(&mut self, well_dir: &Path, well: WellId) -> Result<()> {
        for image in self.target_images(well_dir, well)? {
            if let Err(e) = self.segment_image(&image) {
                warn!(image = %image.display(), error = %e, "Segmentation failed; writing dummy mask");
                // A failed mask write still leaves the remaining images to run.
                match write_dummy_mask(&image) {
                    Ok(mask) => warn!(mask = %mask.display(), "Dummy mask written"),
                    Err(e) => {
                        warn!(image = %image.display(), error = %e, "Dummy mask write failed")
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self, measurement_output: &Path) -> Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }
        let path = metrics::write_metrics(measurement_output, &self.rows)?;
        info!(path = %path.display(), rows = self.rows.len(), "Segmentation metrics written");
        self.rows.clear();
        Ok(())
    }
}
