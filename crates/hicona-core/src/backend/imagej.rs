//! ImageJ macro backend.
//!
//! Wraps a user-supplied macro: a script parameter header derived from the
//! argument types, then `open(preImagePath);`, the macro body, then
//! `saveAs("Tiff", postImagePath);`. The macro runs once per channel of
//! the stitched mosaic; results are read back, clipped to u16 and
//! reassembled as `[C, Y, X]`.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::consts::STITCHED_DIR;
use crate::engine::{FijiEngine, MacroValue};
use crate::error::{HiconaError, Result};
use crate::hyperstack::Hyperstack;
use crate::io;
use crate::plate::WellId;

use super::AnalysisBackend;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageJMacroConfig {
    /// User macro body, run once per channel.
    pub macro_file: PathBuf,
    /// Optional JSON object of string/int/float macro arguments.
    #[serde(default)]
    pub args_file: Option<PathBuf>,
}

/// Load the argument map from a JSON object of string/int/float values.
pub fn load_macro_args(path: &Path) -> Result<Vec<(String, MacroValue)>> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    let object = value.as_object().ok_or_else(|| {
        HiconaError::Pipeline(format!("{}: expected a JSON object", path.display()))
    })?;

    let mut args = Vec::with_capacity(object.len());
    for (key, value) in object {
        let macro_value = match value {
            Value::String(s) => MacroValue::Str(s.clone()),
            Value::Number(n) if n.is_i64() => MacroValue::Int(n.as_i64().unwrap_or(0)),
            Value::Number(n) => MacroValue::Float(n.as_f64().unwrap_or(0.0)),
            other => {
                return Err(HiconaError::Pipeline(format!(
                    "{}: unsupported argument type for {key:?}: {other}",
                    path.display()
                )))
            }
        };
        args.push((key.clone(), macro_value));
    }
    Ok(args)
}

/// Compose the full macro: `#@ <type> <name>` parameter header from the
/// argument list, the open call, the user body, the save call.
pub fn compose_macro(user_macro: &str, args: &[(String, MacroValue)]) -> String {
    let mut text = String::new();
    for (key, value) in args {
        text.push_str(&format!("#@ {} {key}\n", value.declaration()));
    }
    text.push_str("\nopen(preImagePath);\n");
    text.push_str(user_macro);
    if !user_macro.ends_with('\n') {
        text.push('\n');
    }
    text.push_str("saveAs(\"Tiff\", postImagePath);\n");
    text
}

pub struct ImageJMacroBackend {
    config: ImageJMacroConfig,
    engine: &'static FijiEngine,
}

impl ImageJMacroBackend {
    pub fn new(config: ImageJMacroConfig, engine: &'static FijiEngine) -> Self {
        Self { config, engine }
    }

    /// The stitched input for one well: the merged `[C, Y, X]` mosaic when
    /// present, else the single-channel mosaic.
    fn input_pages(&self, well_dir: &Path, well: WellId) -> Result<Vec<Array2<u16>>> {
        let stitched = well_dir.join(STITCHED_DIR);
        let merged = stitched.join(format!("{well}.tif"));
        if merged.is_file() {
            return io::load_pages(&merged);
        }

        let mut mosaics: Vec<PathBuf> = std::fs::read_dir(&stitched)
            .map_err(|_| HiconaError::MissingFile {
                dir: well_dir.to_path_buf(),
                expected: STITCHED_DIR.into(),
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&format!("{well}_ch")) && n.ends_with(".tif"))
            })
            .collect();
        mosaics.sort();
        let first = mosaics.first().ok_or_else(|| HiconaError::MissingFile {
            dir: stitched.clone(),
            expected: format!("{well}_ch*.tif"),
        })?;
        Ok(vec![io::load_plane(first)?])
    }
}

impl AnalysisBackend for ImageJMacroBackend {
    fn name(&self) -> &'static str {
        "imagej-macro"
    }

    fn run_well(&mut self, well_dir: &Path, well: WellId) -> Result<()> {
        let user_macro = std::fs::read_to_string(&self.config.macro_file)?;
        let mut args = match &self.config.args_file {
            Some(path) => load_macro_args(path)?,
            None => Vec::new(),
        };

        let scratch = tempfile::tempdir()?;
        let pre = scratch.path().join("pre.tiff");
        let post = scratch.path().join("post.tiff");
        args.push((
            "preImagePath".to_string(),
            MacroValue::Str(pre.to_string_lossy().into_owned()),
        ));
        args.push((
            "postImagePath".to_string(),
            MacroValue::Str(post.to_string_lossy().into_owned()),
        ));

        let macro_text = compose_macro(&user_macro, &args);

        let pages = self.input_pages(well_dir, well)?;
        let mut processed: Vec<Array2<u16>> = Vec::with_capacity(pages.len());
        for (ch, page) in pages.iter().enumerate() {
            info!(well = %well, channel = ch + 1, "Running ImageJ macro");
            io::save_plane(&pre, &Hyperstack::from_plane(page.clone())?)?;

            self.engine.run_macro(&macro_text, &args)?;

            // load_plane clips float and wide results into the u16 range.
            processed.push(io::load_plane(&post)?);
        }

        let result = Hyperstack::from_channel_planes(processed)?;
        let out_dir = well_dir.join("imagej");
        std::fs::create_dir_all(&out_dir)?;
        io::save_hyperstack(&out_dir.join(format!("{well}_processed.tiff")), &result)?;
        Ok(())
    }

    fn finish(&mut self, _measurement_output: &Path) -> Result<()> {
        Ok(())
    }
}
