use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ndarray::Array2;
use tracing::{error, info, warn};

use crate::backend::{create_backend, AnalysisBackend};
use crate::engine::FijiEngine;
use crate::error::{HiconaError, Result};
use crate::hyperstack::Hyperstack;
use crate::index_xml::IndexXml;
use crate::io;
use crate::measurement::{Measurement, WellFiles};
use crate::naming;
use crate::plate::WellId;
use crate::process::{apply_projection, Projection};
use crate::stitch::{self, tile_config};

use super::config::PipelineConfig;
use super::types::{NoOpReporter, PipelineStage, ProgressReporter, RunSummary};

/// Run the full pipeline without progress reporting.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunSummary> {
    run_pipeline_reported(config, Arc::new(NoOpReporter))
}

/// Run the full pipeline: discover measurements, process every well of
/// each, and aggregate failures into the returned summary. A failed well
/// never aborts the run; the caller decides the exit code from the
/// summary.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<RunSummary> {
    let start = Instant::now();
    let mut summary = RunSummary::default();

    let engine: Option<&'static FijiEngine> = if config.needs_fiji() {
        let path = config.fiji.as_deref().ok_or_else(|| {
            HiconaError::Pipeline(
                "a Fiji launcher path is required for EDF, stitching or the ImageJ backend".into(),
            )
        })?;
        Some(FijiEngine::global(path))
    } else {
        None
    };

    reporter.begin_stage(PipelineStage::Discovery, None);
    let measurements = resolve_measurements(config)?;
    reporter.finish_stage();
    summary.measurements = measurements.len();

    for measurement in &measurements {
        process_measurement(config, measurement, engine, &reporter, &mut summary)?;
    }

    summary.elapsed = start.elapsed();
    info!(
        measurements = summary.measurements,
        wells_ok = summary.wells_ok,
        wells_failed = summary.wells_failed,
        fovs = summary.fovs_processed,
        "Run finished"
    );
    Ok(summary)
}

fn resolve_measurements(config: &PipelineConfig) -> Result<Vec<Measurement>> {
    if let Some(name) = &config.measurement {
        return Ok(vec![Measurement::open(&config.source.join(name))?]);
    }
    // A source that itself holds an images/ directory is a single
    // measurement, not a root of them.
    if config.source.join("images").is_dir() {
        return Ok(vec![Measurement::open(&config.source)?]);
    }
    let measurements = Measurement::list(&config.source)?;
    if measurements.is_empty() {
        return Err(HiconaError::MissingFile {
            dir: config.source.clone(),
            expected: "measurement directories".into(),
        });
    }
    Ok(measurements)
}

fn process_measurement(
    config: &PipelineConfig,
    measurement: &Measurement,
    engine: Option<&'static FijiEngine>,
    reporter: &Arc<dyn ProgressReporter>,
    summary: &mut RunSummary,
) -> Result<()> {
    let output_root = config.output.join(&measurement.config.plate_name);
    std::fs::create_dir_all(&output_root)?;

    let index_xml = match &measurement.index_xml_path {
        Some(path) => match IndexXml::load(path) {
            Ok(xml) => Some(xml),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Index XML unusable");
                None
            }
        },
        None => None,
    };

    let mut backend: Option<Box<dyn AnalysisBackend>> = config
        .backend
        .as_ref()
        .map(|c| create_backend(c, engine))
        .transpose()?;

    let wells = measurement.wells()?;
    info!(
        measurement = %measurement.config.plate_name,
        wells = wells.len(),
        channels = measurement.config.channels,
        planes = measurement.config.planes,
        timepoints = measurement.config.timepoints,
        "Processing measurement"
    );

    reporter.begin_stage(PipelineStage::Preprocessing, Some(wells.len()));
    for (i, well) in wells.iter().enumerate() {
        info!(well = %well.id, "Processing well");
        match process_well(
            config,
            measurement,
            index_xml.as_ref(),
            well,
            &output_root,
            engine,
            backend.as_deref_mut(),
            reporter,
            summary,
        ) {
            Ok(()) => summary.wells_ok += 1,
            Err(e) => {
                error!(well = %well.id, error = %e, "Well failed");
                summary.wells_failed += 1;
            }
        }
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    if let Some(backend) = backend.as_mut() {
        backend.finish(&output_root)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_well(
    config: &PipelineConfig,
    measurement: &Measurement,
    index_xml: Option<&IndexXml>,
    well: &WellFiles,
    output_root: &Path,
    engine: Option<&'static FijiEngine>,
    backend: Option<&mut (dyn AnalysisBackend + 'static)>,
    reporter: &Arc<dyn ProgressReporter>,
    summary: &mut RunSummary,
) -> Result<()> {
    let timepoints = measurement.config.timepoints;
    let timelapse = timepoints > 1;
    if timelapse && config.exports_channels() {
        return Err(HiconaError::Pipeline(
            "channel export and stitching require a single-timepoint acquisition".into(),
        ));
    }

    let well_out = output_root.join(well.id.to_string());
    std::fs::create_dir_all(&well_out)?;

    let max_field = measurement.max_field(well)?;
    for field in 1..=max_field {
        match process_fov(config, measurement, well, field, engine) {
            Ok(stack) => {
                save_fov(config, well.id, field, timelapse, &stack, &well_out)?;
                summary.fovs_processed += 1;
            }
            Err(e) => {
                error!(well = %well.id, field, error = %e, "FOV failed");
                summary.fovs_failed += 1;
            }
        }
    }

    if let Some(stitch_config) = &config.stitch {
        reporter.begin_stage(PipelineStage::Stitching, Some(1));
        let xml = index_xml.ok_or_else(|| {
            HiconaError::Pipeline("stitching requires the measurement index XML".into())
        })?;
        let fields = xml.well_layout.get(&well.id).ok_or_else(|| {
            HiconaError::Pipeline(format!("well {} missing from the index XML layout", well.id))
        })?;
        let reference_dir = well_out.join(naming::channel_dir_name(stitch_config.reference_channel));
        tile_config::write_tile_configuration(&reference_dir, well.id, fields, xml.pixel_size_um)?;

        let engine = engine.ok_or_else(|| {
            HiconaError::Pipeline("stitching requires a Fiji engine".into())
        })?;
        stitch::stitch_well(engine, &well_out, well.id, stitch_config)?;
        reporter.finish_stage();
    }

    if let Some(backend) = backend {
        reporter.begin_stage(PipelineStage::Analysis, Some(1));
        backend.run_well(&well_out, well.id)?;
        reporter.finish_stage();
    }
    Ok(())
}

/// Load, reshape and preprocess every timepoint of one FOV. Timelapse
/// timepoints that fail are logged and skipped; with a single timepoint
/// the failure aborts the FOV.
fn process_fov(
    config: &PipelineConfig,
    measurement: &Measurement,
    well: &WellFiles,
    field: u32,
    engine: Option<&'static FijiEngine>,
) -> Result<Hyperstack> {
    let timepoints = measurement.config.timepoints;
    if timepoints <= 1 {
        return process_timepoint(config, measurement, well, field, None, engine);
    }

    let mut collected = Vec::with_capacity(timepoints);
    for t in 1..=timepoints as u32 {
        match process_timepoint(config, measurement, well, field, Some(t), engine) {
            Ok(stack) => collected.push(stack),
            Err(e) => {
                warn!(well = %well.id, field, timepoint = t, error = %e, "Timepoint failed; skipped");
            }
        }
    }
    if collected.len() > 1 {
        Hyperstack::stack_timepoints(collected)
    } else {
        collected
            .pop()
            .ok_or_else(|| HiconaError::Pipeline("every timepoint failed".into()))
    }
}

fn process_timepoint(
    config: &PipelineConfig,
    measurement: &Measurement,
    well: &WellFiles,
    field: u32,
    timepoint: Option<u32>,
    engine: Option<&'static FijiEngine>,
) -> Result<Hyperstack> {
    let files = measurement.fov_files(well, field, timepoint)?;
    let planes: Vec<Array2<u16>> = files
        .iter()
        .map(|path| io::load_plane(path))
        .collect::<Result<_>>()?;
    let stack = Hyperstack::from_planes(
        planes,
        measurement.config.planes,
        measurement.config.channels,
    )?;

    let projected = apply_projection(stack, config.projection, config.edf_channel, engine)?;
    if config.convert_to_8bit {
        projected.to_8bit()
    } else {
        Ok(projected)
    }
}

/// Save the final hyperstack and, when channel export is on, the
/// per-channel stitch tiles.
fn save_fov(
    config: &PipelineConfig,
    well: WellId,
    field: u32,
    timelapse: bool,
    stack: &Hyperstack,
    well_out: &Path,
) -> Result<()> {
    let suffix = if timelapse {
        "timelapse_hyperstack"
    } else {
        "hyperstack"
    };
    let name = format!("{well}_f{field}_{suffix}.tiff");
    io::save_hyperstack(&well_out.join(name), stack)?;

    if config.exports_channels() {
        if config.projection == Projection::None && stack.axes().label() != "CYX" {
            return Err(HiconaError::Pipeline(
                "channel export requires a projection (or a single-plane acquisition)".into(),
            ));
        }
        for (i, channel) in stack.split_channels()?.into_iter().enumerate() {
            let channel_dir = well_out.join(naming::channel_dir_name(i as u32 + 1));
            std::fs::create_dir_all(&channel_dir)?;
            let tile = channel_dir.join(naming::stitch_tile_name(well, field));
            io::save_plane(&tile, &channel)?;
        }
    }
    Ok(())
}
