//! Instrument configuration (`*.kw.txt`): a hybrid text+JSON format.
//!
//! The file carries a fixed number of non-JSON header and footer lines
//! around a JSON object; stripping those and parsing the remainder yields
//! the acquisition parameters.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::consts::{KW_FOOTER_LINES, KW_HEADER_LINES};
use crate::error::{HiconaError, Result};

/// Typed view over the kw keys the pipeline consumes.
#[derive(Clone, Debug)]
pub struct KwConfig {
    /// Output subdirectory name for the measurement.
    pub plate_name: String,
    pub planes: usize,
    pub timepoints: usize,
    /// Declared field count. Informational only: the actual count is
    /// derived from the files present, which this value drifts from.
    pub fields: Option<usize>,
    pub channels: usize,
    /// Measurement label, e.g. "Measurement 2".
    pub measurement: String,
    pub guid: String,
}

#[derive(Deserialize)]
struct RawKw {
    #[serde(rename = "PLATENAME")]
    plate_name: String,
    #[serde(rename = "PLANES")]
    planes: usize,
    #[serde(rename = "TIMEPOINTS")]
    timepoints: usize,
    #[serde(rename = "FIELDS", default)]
    fields: Option<usize>,
    #[serde(rename = "CHANNEL")]
    channel: Value,
    #[serde(rename = "MEASUREMENT", default)]
    measurement: String,
    #[serde(rename = "GUID", default)]
    guid: String,
}

impl KwConfig {
    /// Load from a `*.kw.txt` file with the default header/footer counts.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, KW_HEADER_LINES, KW_FOOTER_LINES).map_err(|e| {
            HiconaError::KwConfig {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }

    /// Parse the hybrid format: drop `header_lines` from the start and
    /// `footer_lines` from the end, then parse the rest as JSON.
    pub fn parse(text: &str, header_lines: usize, footer_lines: usize) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() < header_lines + footer_lines {
            return Err(HiconaError::Pipeline(format!(
                "kw file has {} lines, fewer than the {} header + {} footer lines",
                lines.len(),
                header_lines,
                footer_lines
            )));
        }
        let body = lines[header_lines..lines.len() - footer_lines].join("\n");
        let raw: RawKw = serde_json::from_str(&body)?;

        // CHANNEL is a list in multi-channel acquisitions and a scalar
        // otherwise; both appear in captured files.
        let channels = match &raw.channel {
            Value::Array(list) => list.len(),
            _ => 1,
        };

        Ok(Self {
            plate_name: raw.plate_name,
            planes: raw.planes,
            timepoints: raw.timepoints,
            fields: raw.fields,
            channels,
            measurement: raw.measurement,
            guid: raw.guid,
        })
    }
}
