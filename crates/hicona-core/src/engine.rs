//! Headless Fiji launcher.
//!
//! Macros are written to a scratch directory per invocation and run as
//! `<fiji> --ij2 --headless --console --run <macro.ijm> 'key="value",...'`.
//! The launcher path is resolved once process-wide and reused across wells;
//! starting Fiji is by far the most expensive part of an invocation.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use tracing::debug;

use crate::error::{HiconaError, Result};

/// One macro argument value, typed so the ImageJ script parameter header
/// can be generated from it.
#[derive(Clone, Debug)]
pub enum MacroValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl MacroValue {
    /// ImageJ script parameter type name for the `#@ <type> <name>` header.
    pub fn declaration(&self) -> &'static str {
        match self {
            MacroValue::Str(_) => "String",
            MacroValue::Int(_) => "int",
            MacroValue::Float(_) => "float",
        }
    }

    fn literal(&self) -> String {
        match self {
            MacroValue::Str(s) => format!("\"{s}\""),
            MacroValue::Int(i) => i.to_string(),
            MacroValue::Float(f) => f.to_string(),
        }
    }
}

/// Render the `--run` argument map: `key="value",count=3`.
pub fn argument_string(args: &[(String, MacroValue)]) -> String {
    args.iter()
        .map(|(key, value)| format!("{key}={}", value.literal()))
        .collect::<Vec<_>>()
        .join(",")
}

/// A resolved Fiji installation.
#[derive(Clone, Debug)]
pub struct FijiEngine {
    executable: PathBuf,
}

static ENGINE: OnceLock<FijiEngine> = OnceLock::new();

impl FijiEngine {
    pub fn new(executable: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
        }
    }

    /// Process-wide instance, resolved on first use. Later calls return the
    /// first resolved engine regardless of the path passed.
    pub fn global(executable: &Path) -> &'static FijiEngine {
        ENGINE.get_or_init(|| FijiEngine::new(executable))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Write `macro_text` to a scratch file and run it headless with the
    /// given argument map. Blocks until Fiji exits.
    pub fn run_macro(&self, macro_text: &str, args: &[(String, MacroValue)]) -> Result<()> {
        let scratch = tempfile::tempdir()?;
        let macro_path = scratch.path().join("macro.ijm");
        std::fs::write(&macro_path, macro_text)?;

        let arg_string = argument_string(args);
        debug!(
            fiji = %self.executable.display(),
            macro_file = %macro_path.display(),
            args = %arg_string,
            "Running Fiji macro"
        );

        let output = Command::new(&self.executable)
            .arg("--ij2")
            .arg("--headless")
            .arg("--console")
            .arg("--run")
            .arg(&macro_path)
            .arg(&arg_string)
            .output()?;

        if !output.status.success() {
            return Err(HiconaError::ExternalTool {
                tool: "Fiji".into(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
