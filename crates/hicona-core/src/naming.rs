//! Filename grammars for Opera Phenix tile exports.
//!
//! Two flavors are in circulation:
//! - archive flavor: `r01c01f03p02-ch01t01.tiff` (`t` = timepoint)
//! - prototype flavor: `r01c01f03p02-ch1sk5fk1fl1.tiff` (`sk` = timepoint)
//!
//! Numeric groups accept any digit count, zero-padded or not.

use std::sync::OnceLock;

use regex::Regex;

use crate::plate::WellId;

/// Indices recovered from one tile filename.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileIndex {
    pub field: u32,
    pub plane: u32,
    pub channel: u32,
    pub timepoint: u32,
}

fn archive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^r(\d+)c(\d+)f(\d+)p(\d+)-ch(\d+)t(\d+)\.tiff?$").unwrap()
    })
}

fn prototype_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^r(\d+)c(\d+)f(\d+)p(\d+)-ch(\d+)sk(\d+)fk\d+fl\d+\.tiff?$").unwrap()
    })
}

/// Parse a tile filename in either flavor.
pub fn parse_tile_name(name: &str) -> Option<(WellId, TileIndex)> {
    let caps = archive_regex()
        .captures(name)
        .or_else(|| prototype_regex().captures(name))?;
    let num = |i: usize| caps[i].parse::<u32>().ok();
    Some((
        WellId::new(num(1)?, num(2)?),
        TileIndex {
            field: num(3)?,
            plane: num(4)?,
            channel: num(5)?,
            timepoint: num(6)?,
        },
    ))
}

/// Whether `name` is a tile of the given well and field, optionally
/// restricted to one timepoint. With `timepoint = None` every timepoint
/// matches, which also covers single-timepoint acquisitions.
pub fn fov_matches(name: &str, well: WellId, field: u32, timepoint: Option<u32>) -> bool {
    match parse_tile_name(name) {
        Some((w, tile)) => {
            w == well
                && tile.field == field
                && timepoint.map_or(true, |t| tile.timepoint == t)
        }
        None => false,
    }
}

/// Name of the per-channel tile exported for stitching, e.g. `r04c05f01.tif`.
/// Fields are 1-based.
pub fn stitch_tile_name(well: WellId, field: u32) -> String {
    format!("{well}f{field:02}.tif")
}

/// Name of a stitched per-channel mosaic, e.g. `r04c05_ch2.tif`.
pub fn mosaic_name(well: WellId, channel: u32) -> String {
    format!("{well}_ch{channel}.tif")
}

/// Name of a per-channel tile directory, e.g. `ch2`. Channels are 1-based.
pub fn channel_dir_name(channel: u32) -> String {
    format!("ch{channel}")
}

/// Parse a channel directory name back to its 1-based channel number.
pub fn parse_channel_dir(name: &str) -> Option<u32> {
    name.strip_prefix("ch")?.parse().ok()
}
