//! TileConfiguration text for ImageJ Grid/Collection stitching.
//!
//! Stage positions come from the index XML in micrometers; dividing by the
//! pixel size yields pixel coordinates. The Y axis is inverted because
//! ImageJ's image coordinates grow downward while the stage's grow upward.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::index_xml::FieldPosition;
use crate::plate::WellId;

/// Render the tile configuration for one well. Fields are listed in field
/// order; entry `i` (0-based) names tile `{well}f{i+1:02}.tif`.
pub fn generate_tile_configuration(
    well: WellId,
    fields: &[FieldPosition],
    pixel_size_um: f64,
) -> String {
    let mut text = String::from(
        "# Define the number of dimensions we are working on\n\
         dim = 2\n\
         # Define the image coordinates (in pixels)\n",
    );
    for (i, field) in fields.iter().enumerate() {
        let x = field.x_um / pixel_size_um;
        let y = -field.y_um / pixel_size_um;
        text.push_str(&format!(
            "{}; ; ({x}, {y})\n",
            crate::naming::stitch_tile_name(well, i as u32 + 1)
        ));
    }
    text
}

/// File name for a well's tile configuration.
pub fn tile_configuration_name(well: WellId) -> String {
    format!("TileConfiguration_{well}.txt")
}

/// Write `TileConfiguration_{well}.txt` into `dir` (normally the reference
/// channel directory) and return its path.
pub fn write_tile_configuration(
    dir: &Path,
    well: WellId,
    fields: &[FieldPosition],
    pixel_size_um: f64,
) -> Result<PathBuf> {
    let path = dir.join(tile_configuration_name(well));
    std::fs::write(&path, generate_tile_configuration(well, fields, pixel_size_um))?;
    Ok(path)
}
