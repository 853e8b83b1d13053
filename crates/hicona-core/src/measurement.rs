//! Measurement discovery and typed file enumeration.
//!
//! A measurement is a directory (conventionally GUID-named) holding exactly
//! one `*.kw.txt` instrument configuration, an `images/` folder and an
//! optional index `*.xml`. Tiles live either in per-well subdirectories of
//! `images/` or flat in `images/` with the well token in the filenames.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::consts::CONFIGDATA_DIR;
use crate::error::{HiconaError, Result};
use crate::kw::KwConfig;
use crate::naming;
use crate::plate::WellId;

/// One microscope acquisition, opened with its kw config parsed.
#[derive(Clone, Debug)]
pub struct Measurement {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub kw_path: PathBuf,
    pub index_xml_path: Option<PathBuf>,
    pub config: KwConfig,
}

/// Where the tiles of one well live.
#[derive(Clone, Debug)]
pub struct WellFiles {
    pub id: WellId,
    /// Directory containing this well's tile files.
    pub dir: PathBuf,
    /// True when tiles of every well share `images/` and are told apart by
    /// the well token in the filename.
    pub flat: bool,
}

fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries: Vec<(String, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

impl Measurement {
    /// Open a measurement directory: locate the unique `*.kw.txt`, the
    /// `images/` directory and the optional index XML, and parse the kw
    /// config eagerly.
    pub fn open(root: &Path) -> Result<Self> {
        let entries = sorted_entries(root)?;

        let kw_path = entries
            .iter()
            .find(|(name, _)| name.ends_with(".kw.txt"))
            .map(|(_, path)| path.clone())
            .ok_or_else(|| HiconaError::MissingFile {
                dir: root.to_path_buf(),
                expected: "*.kw.txt".into(),
            })?;

        let images_dir = root.join("images");
        if !images_dir.is_dir() {
            return Err(HiconaError::MissingFile {
                dir: root.to_path_buf(),
                expected: "images/".into(),
            });
        }

        let index_xml_path = entries
            .iter()
            .find(|(name, _)| name.ends_with(".xml"))
            .map(|(_, path)| path.clone());

        let config = KwConfig::load(&kw_path)?;

        Ok(Self {
            root: root.to_path_buf(),
            images_dir,
            kw_path,
            index_xml_path,
            config,
        })
    }

    /// List the measurements under a source root: every subdirectory except
    /// `_configdata`. Directories that fail to open are skipped with a
    /// warning so one stray folder does not hide the rest.
    pub fn list(source_root: &Path) -> Result<Vec<Measurement>> {
        let mut measurements = Vec::new();
        for (name, path) in sorted_entries(source_root)? {
            if !path.is_dir() || name == CONFIGDATA_DIR {
                continue;
            }
            match Measurement::open(&path) {
                Ok(m) => measurements.push(m),
                Err(e) => warn!(dir = %path.display(), error = %e, "Skipping directory"),
            }
        }
        Ok(measurements)
    }

    /// Discover the wells of this measurement. Per-well subdirectories of
    /// `images/` take precedence; otherwise the sorted unique set of well
    /// tokens is derived from the flat filenames.
    pub fn wells(&self) -> Result<Vec<WellFiles>> {
        let entries = sorted_entries(&self.images_dir)?;

        let mut wells: Vec<WellFiles> = entries
            .iter()
            .filter(|(_, path)| path.is_dir())
            .filter_map(|(name, path)| {
                name.parse::<WellId>().ok().map(|id| WellFiles {
                    id,
                    dir: path.clone(),
                    flat: false,
                })
            })
            .collect();

        if wells.is_empty() {
            let mut ids: Vec<WellId> = entries
                .iter()
                .filter(|(_, path)| path.is_file())
                .filter_map(|(name, _)| naming::parse_tile_name(name).map(|(w, _)| w))
                .collect();
            ids.sort();
            ids.dedup();
            wells = ids
                .into_iter()
                .map(|id| WellFiles {
                    id,
                    dir: self.images_dir.clone(),
                    flat: true,
                })
                .collect();
        }

        wells.sort_by_key(|w| w.id);
        Ok(wells)
    }

    /// Number of fields in a well: the maximum field index present in the
    /// tile filenames. The kw `FIELDS` value is not trusted; it drifts from
    /// the exported data.
    pub fn max_field(&self, well: &WellFiles) -> Result<u32> {
        let max = sorted_entries(&well.dir)?
            .iter()
            .filter_map(|(name, _)| naming::parse_tile_name(name))
            .filter(|(w, _)| *w == well.id)
            .map(|(_, tile)| tile.field)
            .max();
        max.ok_or_else(|| HiconaError::MissingFile {
            dir: well.dir.clone(),
            expected: format!("tile files for well {}", well.id),
        })
    }

    /// Enumerate one FOV's tile files sorted by (plane, channel), so a flat
    /// load order of `p01-ch1, p01-ch2, p02-ch1, ...` holds. An optional
    /// timepoint restricts the set to that timepoint.
    pub fn fov_files(
        &self,
        well: &WellFiles,
        field: u32,
        timepoint: Option<u32>,
    ) -> Result<Vec<PathBuf>> {
        let mut tiles: Vec<(u32, u32, PathBuf)> = sorted_entries(&well.dir)?
            .into_iter()
            .filter(|(name, _)| naming::fov_matches(name, well.id, field, timepoint))
            .filter_map(|(name, path)| {
                naming::parse_tile_name(&name).map(|(_, t)| (t.plane, t.channel, path))
            })
            .collect();
        tiles.sort_by_key(|(plane, channel, _)| (*plane, *channel));
        Ok(tiles.into_iter().map(|(_, _, path)| path).collect())
    }
}
