use std::time::Duration;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug)]
pub enum PipelineStage {
    Discovery,
    Preprocessing,
    Stitching,
    Analysis,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "Discovering measurements"),
            Self::Preprocessing => write!(f, "Processing wells"),
            Self::Stitching => write!(f, "Stitching"),
            Self::Analysis => write!(f, "Running analysis"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars or logging. All
/// methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g. well count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Failure-aggregating outcome of a run. A nonzero `wells_failed` (or
/// `fovs_failed`) should map to a nonzero process exit code.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub measurements: usize,
    pub wells_ok: usize,
    pub wells_failed: usize,
    pub fovs_processed: usize,
    pub fovs_failed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.wells_failed > 0 || self.fovs_failed > 0
    }
}
