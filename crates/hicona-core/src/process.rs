//! Per-FOV preprocessing: projections and bit-depth conversion.
//!
//! Maximum/minimum projections are pure array folds. The extended-depth-
//! of-focus projection is delegated to Fiji: the configured channel's
//! `[Z, Y, X]` substack goes out as a temp TIFF, the bundled EDF macro runs
//! on it, and the result comes back as the projected channel while every
//! other channel gets a maximum projection.

use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{FijiEngine, MacroValue};
use crate::error::{HiconaError, Result};
use crate::hyperstack::{Axis, Hyperstack};
use crate::io;

/// Z-collapse strategy applied to each FOV before saving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    None,
    Maximum,
    Minimum,
    /// Extended depth of focus through Fiji, applied to one channel.
    ImagejEdf,
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Maximum => write!(f, "maximum"),
            Self::Minimum => write!(f, "minimum"),
            Self::ImagejEdf => write!(f, "ImageJ EDF"),
        }
    }
}

const EDF_MACRO: &str = r#"#@ String edfImagePath
#@ String procImagePath

open(edfImagePath);
run("EDF Easy mode", "quality='2' topology='0' show-topology='off' show-view='off'");
while (!isOpen("Output")) {
    wait(5000);
}
selectImage("Output");
run("16-bit");
run("Enhance Contrast", "saturated=0.35");
saveAs("Tiff", procImagePath);
close("*");
"#;

/// Apply the configured projection. Stacks without a `Z` axis pass through
/// unchanged (a single-plane acquisition has nothing to collapse).
pub fn apply_projection(
    stack: Hyperstack,
    projection: Projection,
    edf_channel: usize,
    engine: Option<&FijiEngine>,
) -> Result<Hyperstack> {
    if projection == Projection::None || !stack.axes().contains(Axis::Z) {
        if projection != Projection::None {
            debug!(projection = %projection, "No Z axis; projection skipped");
        }
        return Ok(stack);
    }
    match projection {
        Projection::None => unreachable!(),
        Projection::Maximum => stack.project_max(),
        Projection::Minimum => stack.project_min(),
        Projection::ImagejEdf => {
            let engine = engine.ok_or_else(|| {
                HiconaError::Pipeline("EDF projection requires a Fiji engine".into())
            })?;
            project_edf(&stack, edf_channel, engine)
        }
    }
}

/// EDF-project `edf_channel` (0-based) through Fiji; maximum-project every
/// other channel. Result is a `[C, Y, X]` u16 stack.
pub fn project_edf(
    stack: &Hyperstack,
    edf_channel: usize,
    engine: &FijiEngine,
) -> Result<Hyperstack> {
    let n_channels = stack
        .axis_len(Axis::C)
        .ok_or(HiconaError::MissingAxis { axis: 'C' })?;
    let max_projected = stack.project_max()?;
    let max_channels = max_projected.split_channels()?;

    let mut channels: Vec<Array2<u16>> = Vec::with_capacity(n_channels);
    for (ch, max_plane) in max_channels.into_iter().enumerate() {
        if ch == edf_channel {
            let substack = stack.channel_substack(ch)?;
            channels.push(run_edf_macro(&substack, engine)?);
        } else {
            channels.push(plane_to_array(&max_plane)?);
        }
    }
    Hyperstack::from_channel_planes(channels)
}

fn plane_to_array(plane: &Hyperstack) -> Result<Array2<u16>> {
    use crate::hyperstack::PixelData;
    let shape = plane.shape();
    let dim = (shape[0], shape[1]);
    match plane.data() {
        PixelData::U16(a) => Ok(Array2::from_shape_vec(dim, a.iter().copied().collect())?),
        PixelData::U8(a) => Ok(Array2::from_shape_vec(
            dim,
            a.iter().map(|&v| u16::from(v)).collect(),
        )?),
    }
}

fn run_edf_macro(substack: &ndarray::ArrayD<u16>, engine: &FijiEngine) -> Result<Array2<u16>> {
    let scratch = tempfile::tempdir()?;
    let edf_temp = scratch.path().join("ref_ch.tiff");
    let proc_temp = scratch.path().join("proc.tif");

    io::save_substack(&edf_temp, substack)?;

    let args = vec![
        ("edfImagePath".to_string(), MacroValue::Str(path_str(&edf_temp))),
        ("procImagePath".to_string(), MacroValue::Str(path_str(&proc_temp))),
    ];
    engine.run_macro(EDF_MACRO, &args)?;

    io::load_plane(&proc_temp)
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
