use std::path::PathBuf;

use crate::tile::Aggregate;
use crate::validate::ShapeMismatchSkip;

/// Pipeline stage, used for progress reporting.
#[derive(Clone, Copy, Debug)]
pub enum JobStage {
    Reading,
    Stacking,
    Aggregating,
    Writing,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "Reading tiles"),
            Self::Stacking => write!(f, "Building stack"),
            Self::Aggregating => write!(f, "Aggregating"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can drive progress bars or logging; all methods have
/// default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items
    /// in this stage (e.g., file count), if known.
    fn begin_stage(&self, _stage: JobStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op reporter, used when `run_job` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Everything a run produced.
#[derive(Clone, Debug)]
pub struct JobOutput {
    /// Number of tiles that made it into the stack.
    pub observations: usize,
    /// Tiles dropped by shape validation.
    pub skipped: Vec<ShapeMismatchSkip>,
    pub mean: Option<Aggregate>,
    pub sigma_clipped: Option<Aggregate>,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
}
