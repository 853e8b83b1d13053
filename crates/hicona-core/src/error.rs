use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HiconaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Invalid well token: {0}")]
    InvalidWellToken(String),

    #[error("Invalid kw config {path}: {reason}")]
    KwConfig { path: PathBuf, reason: String },

    #[error("Invalid index XML {path}: {reason}")]
    IndexXml { path: PathBuf, reason: String },

    #[error("Missing file: {expected} under {dir}")]
    MissingFile { dir: PathBuf, expected: String },

    #[error("Plane count mismatch: expected {expected} ({planes} planes x {channels} channels), got {actual}")]
    PlaneCountMismatch {
        expected: usize,
        planes: usize,
        channels: usize,
        actual: usize,
    },

    #[error("Axes label {label:?} does not match array dimensionality {ndim}")]
    AxesMismatch { label: String, ndim: usize },

    #[error("Hyperstack has no {axis} axis")]
    MissingAxis { axis: char },

    #[error("{tool} failed with {status}: {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

pub type Result<T> = std::result::Result<T, HiconaError>;
