//! Per-well stitching through Fiji's Grid/Collection plugin.
//!
//! The reference channel is stitched with `compute_overlap` against the
//! generated tile configuration; the registered layout it produces is then
//! reused for every remaining channel with `subpixel_accuracy`. When more
//! than one channel was stitched the per-channel mosaics are merged
//! natively into one `[C, Y, X]` hyperstack.

pub mod tile_config;

use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{
    STITCHED_DIR, STITCH_ABSOLUTE_DISPLACEMENT, STITCH_MAX_AVG_DISPLACEMENT,
    STITCH_REGRESSION_THRESHOLD,
};
use crate::engine::{FijiEngine, MacroValue};
use crate::error::{HiconaError, Result};
use crate::hyperstack::Hyperstack;
use crate::io;
use crate::naming;
use crate::plate::WellId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StitchConfig {
    /// 1-based channel stitched first; its registered tile positions are
    /// reused for the other channels.
    #[serde(default = "default_reference_channel")]
    pub reference_channel: u32,
}

fn default_reference_channel() -> u32 {
    1
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            reference_channel: default_reference_channel(),
        }
    }
}

fn stitch_macro(layout_file: &str, registration: &str) -> String {
    format!(
        r#"#@ String orgDir
#@ String saveDir
#@ String mosaicName

run("Grid/Collection stitching", "type=[Positions from file] order=[Defined by TileConfiguration] directory=[" + orgDir + "] layout_file={layout_file} fusion_method=[Linear Blending] regression_threshold={STITCH_REGRESSION_THRESHOLD:.2} max/avg_displacement_threshold={STITCH_MAX_AVG_DISPLACEMENT:.2} absolute_displacement_threshold={STITCH_ABSOLUTE_DISPLACEMENT:.2} {registration} computation_parameters=[Save memory (but be slower)] image_output=[Fuse and display]");
saveAs("Tiff", saveDir + File.separator + mosaicName);
close("*");
"#
    )
}

/// Macro text stitching the reference channel from the generated layout,
/// computing tile overlap.
pub fn reference_macro(well: WellId) -> String {
    stitch_macro(
        &format!("TileConfiguration_{well}.txt"),
        "compute_overlap",
    )
}

/// Macro text stitching a remaining channel from the registered layout.
pub fn registered_macro(well: WellId) -> String {
    stitch_macro(
        &format!("TileConfiguration_{well}.registered.txt"),
        "subpixel_accuracy",
    )
}

fn run_stitch(
    engine: &FijiEngine,
    macro_text: &str,
    channel_dir: &Path,
    stitched_dir: &Path,
    mosaic: &str,
) -> Result<()> {
    let args = vec![
        (
            "orgDir".to_string(),
            MacroValue::Str(channel_dir.to_string_lossy().into_owned()),
        ),
        (
            "saveDir".to_string(),
            MacroValue::Str(stitched_dir.to_string_lossy().into_owned()),
        ),
        ("mosaicName".to_string(), MacroValue::Str(mosaic.to_string())),
    ];
    engine.run_macro(macro_text, &args)
}

fn channel_dirs(well_dir: &Path) -> Result<Vec<(u32, std::path::PathBuf)>> {
    let mut dirs: Vec<(u32, std::path::PathBuf)> = std::fs::read_dir(well_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            naming::parse_channel_dir(&e.file_name().to_string_lossy()).map(|ch| (ch, e.path()))
        })
        .collect();
    dirs.sort_by_key(|(ch, _)| *ch);
    Ok(dirs)
}

fn copy_tile_configurations(reference_dir: &Path, others: &[(u32, std::path::PathBuf)]) -> Result<()> {
    let configs: Vec<std::path::PathBuf> = std::fs::read_dir(reference_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    for (_, dir) in others {
        for config in &configs {
            if let Some(name) = config.file_name() {
                std::fs::copy(config, dir.join(name))?;
            }
        }
    }
    Ok(())
}

/// Stitch one exported well directory: `ch{N}/` tile dirs with the tile
/// configuration present in the reference channel dir. Mosaics land in
/// `Stitched/` under the well directory.
pub fn stitch_well(
    engine: &FijiEngine,
    well_dir: &Path,
    well: WellId,
    config: &StitchConfig,
) -> Result<()> {
    let stitched_dir = well_dir.join(STITCHED_DIR);
    std::fs::create_dir_all(&stitched_dir)?;

    let all_channels = channel_dirs(well_dir)?;
    let reference = all_channels
        .iter()
        .find(|(ch, _)| *ch == config.reference_channel)
        .cloned()
        .ok_or_else(|| HiconaError::MissingFile {
            dir: well_dir.to_path_buf(),
            expected: naming::channel_dir_name(config.reference_channel),
        })?;
    let remaining: Vec<(u32, std::path::PathBuf)> = all_channels
        .iter()
        .filter(|(ch, _)| *ch != config.reference_channel)
        .cloned()
        .collect();

    info!(well = %well, channel = reference.0, "Stitching reference channel");
    run_stitch(
        engine,
        &reference_macro(well),
        &reference.1,
        &stitched_dir,
        &naming::mosaic_name(well, reference.0),
    )?;

    copy_tile_configurations(&reference.1, &remaining)?;

    for (ch, dir) in &remaining {
        debug!(well = %well, channel = ch, "Stitching channel from registered layout");
        run_stitch(
            engine,
            &registered_macro(well),
            dir,
            &stitched_dir,
            &naming::mosaic_name(well, *ch),
        )?;
    }

    if !remaining.is_empty() {
        let channels: Vec<u32> = all_channels.iter().map(|(ch, _)| *ch).collect();
        merge_mosaics(&stitched_dir, well, &channels)?;
    }
    Ok(())
}

/// Combine per-channel mosaics into one `[C, Y, X]` hyperstack
/// `Stitched/{well}.tif`. Registered mosaics can differ by a few pixels per
/// channel, so all are cropped to the common minimum extent first.
pub fn merge_mosaics(stitched_dir: &Path, well: WellId, channels: &[u32]) -> Result<()> {
    let mosaics: Vec<Array2<u16>> = channels
        .iter()
        .map(|ch| io::load_plane(&stitched_dir.join(naming::mosaic_name(well, *ch))))
        .collect::<Result<_>>()?;

    let min_h = mosaics.iter().map(|m| m.nrows()).min().unwrap_or(0);
    let min_w = mosaics.iter().map(|m| m.ncols()).min().unwrap_or(0);
    let cropped: Vec<Array2<u16>> = mosaics
        .into_iter()
        .map(|m| m.slice(ndarray::s![..min_h, ..min_w]).to_owned())
        .collect();

    let merged = Hyperstack::from_channel_planes(cropped)?;
    io::save_hyperstack(&stitched_dir.join(format!("{well}.tif")), &merged)?;
    Ok(())
}
