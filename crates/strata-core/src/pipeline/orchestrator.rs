use tracing::info;

use crate::consts::{OUTPUT_MEAN_FILENAME, OUTPUT_PLOT_FILENAME, OUTPUT_SIGMA_FILENAME};
use crate::error::Result;
use crate::io::discover::discover_inputs;
use crate::io::geotiff::read_geotiff;
use crate::io::geotiff_writer::write_geotiff;
use crate::io::preview::save_comparison_png;
use crate::mask::apply_threshold;
use crate::stack::mean::mean_stack;
use crate::stack::sigma_clip::sigma_clip_stack;
use crate::stack::Stack;
use crate::validate::validate_shapes;

use super::config::JobConfig;
use super::types::{JobOutput, JobStage, NoOpReporter, ProgressReporter};

/// Run a stacking job end to end with a progress reporter.
///
/// Discover inputs, read and threshold-mask each tile, validate shapes
/// against the first tile, assemble the stack, run the enabled aggregators,
/// then write the outputs into the input folder. A tile that fails to read
/// aborts the run; a shape mismatch only drops that tile. Output metadata
/// and every aggregate are computed before the first byte is written, so a
/// failed run leaves no partial artifacts.
pub fn run_job_reported(
    config: &JobConfig,
    reporter: &dyn ProgressReporter,
) -> Result<JobOutput> {
    config.validate()?;

    let paths = discover_inputs(&config.folder)?;
    info!(folder = %config.folder.display(), inputs = paths.len(), "Starting stacking job");

    reporter.begin_stage(JobStage::Reading, Some(paths.len()));
    let mut tiles = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let mut tile = read_geotiff(path)?;
        if let Some(threshold) = config.threshold {
            apply_threshold(&mut tile, threshold);
        }
        tiles.push(tile);
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    let (accepted, skipped) = validate_shapes(tiles)?;
    let reference_meta = accepted[0].metadata.clone();
    info!(
        accepted = accepted.len(),
        skipped = skipped.len(),
        "Shape validation complete"
    );

    reporter.begin_stage(JobStage::Stacking, None);
    let stack = Stack::from_tiles(accepted)?;
    reporter.finish_stage();

    reporter.begin_stage(JobStage::Aggregating, None);
    let mean = if config.mean_stacking {
        Some(mean_stack(&stack)?)
    } else {
        None
    };
    let sigma_clipped = match config.sigma_params() {
        Some(params) => Some(sigma_clip_stack(&stack, &params)?),
        None => None,
    };
    reporter.finish_stage();

    // Everything needed for output must exist before the first write.
    let bands = stack.tile_shape().0;
    let out_meta = reference_meta.for_output(bands as u32)?;

    reporter.begin_stage(JobStage::Writing, None);
    let mut written = Vec::new();
    if let Some(ref aggregate) = mean {
        let path = config.folder.join(OUTPUT_MEAN_FILENAME);
        write_geotiff(&path, aggregate, &out_meta)?;
        info!(path = %path.display(), "Mean aggregate written");
        written.push(path);
    }
    if let Some(ref aggregate) = sigma_clipped {
        let path = config.folder.join(OUTPUT_SIGMA_FILENAME);
        write_geotiff(&path, aggregate, &out_meta)?;
        info!(path = %path.display(), "Sigma-clipped aggregate written");
        written.push(path);
    }

    let mut panels = Vec::new();
    if let Some(ref aggregate) = mean {
        panels.push(("Mean stack", aggregate.masked_band(0)));
    }
    if let Some(ref aggregate) = sigma_clipped {
        panels.push(("Sigma clipped", aggregate.masked_band(0)));
    }
    if !panels.is_empty() {
        let views: Vec<_> = panels.iter().map(|(t, p)| (*t, p.view())).collect();
        let path = config.folder.join(OUTPUT_PLOT_FILENAME);
        save_comparison_png(&path, &views)?;
        written.push(path);
    }
    reporter.finish_stage();

    Ok(JobOutput {
        observations: stack.observations(),
        skipped,
        mean,
        sigma_clipped,
        written,
    })
}

/// Run a stacking job without progress reporting.
pub fn run_job(config: &JobConfig) -> Result<JobOutput> {
    run_job_reported(config, &NoOpReporter)
}
