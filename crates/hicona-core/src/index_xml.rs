//! Index XML: well layout and pixel calibration for one measurement.
//!
//! The document uses a single default namespace; all lookups match on
//! local element names in document order.

use std::collections::BTreeMap;
use std::path::Path;

use roxmltree::{Document, Node};

use crate::consts::OBJECTIVE_CORRECTION_FACTOR;
use crate::error::{HiconaError, Result};
use crate::plate::WellId;

/// Stage position of one field within a well, in micrometers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldPosition {
    pub x_um: f64,
    pub y_um: f64,
}

/// Parsed index XML contents.
#[derive(Clone, Debug)]
pub struct IndexXml {
    /// Effective pixel size in micrometers.
    pub pixel_size_um: f64,
    /// Channel names in acquisition order.
    pub channel_order: Vec<String>,
    /// Field positions per well, in field order.
    pub well_layout: BTreeMap<WellId, Vec<FieldPosition>>,
}

impl IndexXml {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| HiconaError::IndexXml {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let doc = Document::parse(text)
            .map_err(|e| HiconaError::Pipeline(format!("XML parse error: {e}")))?;
        let root = doc.root_element();

        let pixel_size_um = pixel_size(&root)?;
        let channel_order = channel_order(&root);
        let well_layout = well_layout(&root)?;

        Ok(Self {
            pixel_size_um,
            channel_order,
            well_layout,
        })
    }
}

fn descendant<'a>(node: &Node<'a, 'a>, path: &[&str]) -> Option<Node<'a, 'a>> {
    let mut current = *node;
    for name in path {
        current = current
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == *name)?;
    }
    Some(current)
}

fn child<'a>(node: &Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn text_at(node: &Node, path: &[&str]) -> Result<String> {
    descendant(node, path)
        .and_then(|n| n.text().map(str::to_string))
        .ok_or_else(|| HiconaError::Pipeline(format!("missing element {}", path.join("/"))))
}

fn child_text(node: &Node, name: &str) -> Result<String> {
    child(node, name)
        .and_then(|n| n.text().map(str::to_string))
        .ok_or_else(|| HiconaError::Pipeline(format!("missing child element {name}")))
}

/// `PixelSizeX(m) * 1e6 * BinningX / (ObjectiveMagnification * 1.87)`.
fn pixel_size(root: &Node) -> Result<f64> {
    let camera_px_m: f64 = text_at(
        root,
        &["InstrumentDescription", "Cameras", "Camera", "PixelSizeX"],
    )?
    .trim()
    .parse()
    .map_err(|e| HiconaError::Pipeline(format!("bad PixelSizeX: {e}")))?;

    let exposures = descendant(root, &["Experiment", "Exposures"])
        .ok_or_else(|| HiconaError::Pipeline("missing Experiment/Exposures".into()))?;
    let binning: f64 = text_at(
        &exposures,
        &["Exposure", "SimpleChannel", "CameraSetting", "BinningX"],
    )?
    .trim()
    .parse()
    .map_err(|e| HiconaError::Pipeline(format!("bad BinningX: {e}")))?;
    let magnification: f64 = text_at(&exposures, &["Exposure", "ObjectiveMagnification"])?
        .trim()
        .parse()
        .map_err(|e| HiconaError::Pipeline(format!("bad ObjectiveMagnification: {e}")))?;

    Ok((camera_px_m * 1e6 * binning) / (magnification * OBJECTIVE_CORRECTION_FACTOR))
}

/// Text of every `Sequence/Record/Channel` element, in document order.
fn channel_order(root: &Node) -> Vec<String> {
    root.descendants()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == "Channel"
                && n.parent_element()
                    .is_some_and(|p| p.tag_name().name() == "Record")
                && n.parent_element()
                    .and_then(|p| p.parent_element())
                    .is_some_and(|g| g.tag_name().name() == "Sequence")
        })
        .filter_map(|n| n.text().map(str::to_string))
        .collect()
}

/// Field positions per well. Each well references a sublayout by 1-based
/// document-order index; sublayout field X/Y are in meters.
fn well_layout(root: &Node) -> Result<BTreeMap<WellId, Vec<FieldPosition>>> {
    let experiment = descendant(root, &["Experiment"])
        .ok_or_else(|| HiconaError::Pipeline("missing Experiment".into()))?;

    let sublayouts: Vec<Node> = experiment
        .descendants()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == "Sublayout"
                && n.parent_element()
                    .is_some_and(|p| p.tag_name().name() == "Sublayouts")
        })
        .collect();

    let wells = experiment.descendants().filter(|n| {
        n.is_element()
            && n.tag_name().name() == "Well"
            && n.parent_element()
                .is_some_and(|p| p.tag_name().name() == "Wells")
    });

    let mut layout = BTreeMap::new();
    for well in wells {
        let row: u32 = child_text(&well, "Row")?
            .trim()
            .parse()
            .map_err(|e| HiconaError::Pipeline(format!("bad well Row: {e}")))?;
        let col: u32 = child_text(&well, "Col")?
            .trim()
            .parse()
            .map_err(|e| HiconaError::Pipeline(format!("bad well Col: {e}")))?;
        let sublayout_id: usize = child_text(&well, "SublayoutID")?
            .trim()
            .parse()
            .map_err(|e| HiconaError::Pipeline(format!("bad SublayoutID: {e}")))?;

        let sublayout = sublayouts
            .get(sublayout_id.wrapping_sub(1))
            .ok_or_else(|| {
                HiconaError::Pipeline(format!("SublayoutID {sublayout_id} out of range"))
            })?;

        let mut fields = Vec::new();
        for field in sublayout
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "Field")
        {
            let x_m: f64 = child_text(&field, "X")?
                .trim()
                .parse()
                .map_err(|e| HiconaError::Pipeline(format!("bad field X: {e}")))?;
            let y_m: f64 = child_text(&field, "Y")?
                .trim()
                .parse()
                .map_err(|e| HiconaError::Pipeline(format!("bad field Y: {e}")))?;
            fields.push(FieldPosition {
                x_um: x_m * 1e6,
                y_um: y_m * 1e6,
            });
        }

        layout.insert(WellId::new(row, col), fields);
    }

    Ok(layout)
}
