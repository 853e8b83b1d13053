//! Pluggable analysis back ends.
//!
//! A backend runs against a well's output directory after preprocessing
//! and stitching, producing artifact files and metric rows. Backend
//! failures surface as typed errors at the call site; the orchestrator
//! logs and counts them without aborting the run.

pub mod cellpose;
pub mod imagej;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::FijiEngine;
use crate::error::Result;
use crate::plate::WellId;

pub use cellpose::{CellposeBackend, CellposeConfig, ProcessTarget};
pub use imagej::{ImageJMacroBackend, ImageJMacroConfig};

/// Which analysis tool to run, with its configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    Cellpose(CellposeConfig),
    ImagejMacro(ImageJMacroConfig),
}

/// Common seam for the two analysis tools.
pub trait AnalysisBackend {
    fn name(&self) -> &'static str;

    /// Run the tool over one processed well directory.
    fn run_well(&mut self, well_dir: &Path, well: WellId) -> Result<()>;

    /// Flush accumulated outputs (metric files) to the measurement output
    /// root. Called once per measurement, after the last well.
    fn finish(&mut self, measurement_output: &Path) -> Result<()>;
}

/// Instantiate the configured backend. The ImageJ macro backend needs the
/// Fiji engine; Cellpose runs through its own CLI.
pub fn create_backend(
    config: &BackendConfig,
    engine: Option<&'static FijiEngine>,
) -> Result<Box<dyn AnalysisBackend>> {
    match config {
        BackendConfig::Cellpose(c) => Ok(Box::new(CellposeBackend::new(c.clone()))),
        BackendConfig::ImagejMacro(c) => {
            let engine = engine.ok_or_else(|| {
                crate::error::HiconaError::Pipeline(
                    "ImageJ macro backend requires a Fiji engine".into(),
                )
            })?;
            Ok(Box::new(ImageJMacroBackend::new(c.clone(), engine)))
        }
    }
}
