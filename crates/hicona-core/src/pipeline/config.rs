use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backend::BackendConfig;
use crate::process::Projection;
use crate::stitch::StitchConfig;

/// Full pipeline configuration. Every optional stage defaults to off;
/// unknown keys in a config file are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source root holding measurement directories, or a single
    /// measurement directory.
    pub source: PathBuf,
    /// Output root; each measurement lands in `<output>/<PLATENAME>/`.
    pub output: PathBuf,
    /// Process only the measurement in this subdirectory of `source`.
    #[serde(default)]
    pub measurement: Option<String>,
    #[serde(default)]
    pub projection: Projection,
    /// 0-based channel to EDF-project when `projection` is the ImageJ EDF.
    #[serde(default)]
    pub edf_channel: usize,
    #[serde(default)]
    pub convert_to_8bit: bool,
    /// Export per-channel tiles. Implied by stitching.
    #[serde(default)]
    pub split_channels: bool,
    #[serde(default)]
    pub stitch: Option<StitchConfig>,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    /// Fiji launcher, needed for EDF, stitching and the ImageJ backend.
    #[serde(default)]
    pub fiji: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            output: PathBuf::from("processed"),
            measurement: None,
            projection: Projection::default(),
            edf_channel: 0,
            convert_to_8bit: false,
            split_channels: false,
            stitch: None,
            backend: None,
            fiji: None,
        }
    }
}

impl PipelineConfig {
    /// Whether per-channel tiles must be exported (explicitly requested or
    /// required by stitching).
    pub fn exports_channels(&self) -> bool {
        self.split_channels || self.stitch.is_some()
    }

    /// Whether any configured stage needs the Fiji engine.
    pub fn needs_fiji(&self) -> bool {
        self.projection == Projection::ImagejEdf
            || self.stitch.is_some()
            || matches!(self.backend, Some(BackendConfig::ImagejMacro(_)))
    }
}
