//! Segmentation metric files.
//!
//! Each run appends a `processing_data_{N}.csv` to the measurement output
//! root, where `N` is one more than the highest existing index so earlier
//! runs are never overwritten.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;

/// One row of segmentation metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricRow {
    pub filename: String,
    pub estimated_diameter: f64,
    pub processing_time_s: f64,
}

fn metrics_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^processing_data_(\d+)\.csv$").unwrap())
}

/// Next free metrics path under `dir`: index = max existing + 1, or 0 when
/// no metrics file exists yet.
pub fn next_metrics_path(dir: &Path) -> Result<PathBuf> {
    let mut max_index: Option<u32> = None;
    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(caps) = metrics_name_regex().captures(&name) {
                if let Ok(index) = caps[1].parse::<u32>() {
                    max_index = Some(max_index.map_or(index, |m: u32| m.max(index)));
                }
            }
        }
    }
    let next = max_index.map_or(0, |m| m + 1);
    Ok(dir.join(format!("processing_data_{next}.csv")))
}

/// Write accumulated metric rows to the next free `processing_data_{N}.csv`
/// under `dir` and return the path written.
pub fn write_metrics(dir: &Path, rows: &[MetricRow]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = next_metrics_path(dir)?;
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["Filename", "Estimated Diameter", "Processing Time [s]"])?;
    for row in rows {
        writer.write_record([
            row.filename.as_str(),
            &row.estimated_diameter.to_string(),
            &row.processing_time_s.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(path)
}
