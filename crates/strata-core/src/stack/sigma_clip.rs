use ndarray::Array3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_MAX_ITERS, DEFAULT_SIGMA, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{Result, StrataError};
use crate::stack::build::Stack;
use crate::tile::Aggregate;

/// Parameters for sigma-clipped mean aggregation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SigmaClipParams {
    /// Sigma multiplier — values beyond mean +/- sigma*stddev are rejected.
    pub sigma: f32,
    /// Maximum number of reject-and-recompute iterations.
    pub max_iters: usize,
}

impl Default for SigmaClipParams {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
            max_iters: DEFAULT_MAX_ITERS,
        }
    }
}

/// Aggregate a stack by the iterative sigma-clipped mean.
///
/// Per (band, row, col), independently: compute mean and stddev over the
/// valid observations, reject observations outside
/// `[mean - sigma*stddev, mean + sigma*stddev]`, and repeat until the active
/// set stops changing or `max_iters` rejection passes have run. The output
/// value is the mean of the surviving observations; a coordinate where none
/// survive (or none were valid to begin with) comes out missing.
///
/// Statistics accumulate in f64 so the clipping bounds don't drift over
/// iterations on f32 storage. Row-parallel via Rayon for images at or above
/// `PARALLEL_PIXEL_THRESHOLD` pixels; results are identical to the
/// sequential path because coordinates share no state.
pub fn sigma_clip_stack(stack: &Stack, params: &SigmaClipParams) -> Result<Aggregate> {
    if !(params.sigma > 0.0) {
        return Err(StrataError::Config(format!(
            "sigma must be positive, got {}",
            params.sigma
        )));
    }
    if params.max_iters == 0 {
        return Err(StrataError::Config("max_iters must be at least 1".into()));
    }

    let (n, b, h, w) = stack.values.dim();
    if n == 0 {
        return Err(StrataError::EmptyStack);
    }

    let mut values = Array3::<f32>::zeros((b, h, w));
    let mut valid = Array3::<bool>::from_elem((b, h, w), false);

    if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        for band in 0..b {
            // Row-parallel: each row allocates its own column buffers
            let rows: Vec<(Vec<f32>, Vec<bool>)> = (0..h)
                .into_par_iter()
                .map(|row| {
                    let mut column = vec![0.0f32; n];
                    let mut active = vec![false; n];
                    let mut row_values = vec![0.0f32; w];
                    let mut row_valid = vec![false; w];
                    for col in 0..w {
                        load_column(stack, band, row, col, &mut column, &mut active);
                        let (value, ok) = clip_column(&column, &mut active, params);
                        row_values[col] = value;
                        row_valid[col] = ok;
                    }
                    (row_values, row_valid)
                })
                .collect();

            for (row, (row_values, row_valid)) in rows.into_iter().enumerate() {
                for col in 0..w {
                    values[[band, row, col]] = row_values[col];
                    valid[[band, row, col]] = row_valid[col];
                }
            }
        }
    } else {
        let mut column = vec![0.0f32; n];
        let mut active = vec![false; n];

        for band in 0..b {
            for row in 0..h {
                for col in 0..w {
                    load_column(stack, band, row, col, &mut column, &mut active);
                    let (value, ok) = clip_column(&column, &mut active, params);
                    values[[band, row, col]] = value;
                    valid[[band, row, col]] = ok;
                }
            }
        }
    }

    debug!(
        observations = n,
        sigma = params.sigma,
        max_iters = params.max_iters,
        "Sigma-clipped aggregation complete"
    );
    Ok(Aggregate { values, valid })
}

/// Copy one observation column and its validity into the scratch buffers.
fn load_column(
    stack: &Stack,
    band: usize,
    row: usize,
    col: usize,
    column: &mut [f32],
    active: &mut [bool],
) {
    for obs in 0..column.len() {
        column[obs] = stack.values[[obs, band, row, col]];
        active[obs] = stack.valid[[obs, band, row, col]];
    }
}

/// The per-coordinate reduction. `active` enters as the validity mask and
/// leaves holding the surviving observations. Returns (value, validity).
fn clip_column(column: &[f32], active: &mut [bool], params: &SigmaClipParams) -> (f32, bool) {
    let sigma = params.sigma as f64;

    for _ in 0..params.max_iters {
        let Some((mean, stddev)) = mean_stddev(column, active) else {
            // Nothing left to clip against; the coordinate is missing.
            return (0.0, false);
        };

        let lo = mean - sigma * stddev;
        let hi = mean + sigma * stddev;

        let mut changed = false;
        for (i, &v) in column.iter().enumerate() {
            if active[i] {
                let v = v as f64;
                if v < lo || v > hi {
                    active[i] = false;
                    changed = true;
                }
            }
        }

        // The active set only ever shrinks, so an unchanged pass means
        // convergence.
        if !changed {
            break;
        }
    }

    let mut sum = 0.0f64;
    let mut count = 0u32;
    for (i, &v) in column.iter().enumerate() {
        if active[i] {
            sum += v as f64;
            count += 1;
        }
    }
    if count > 0 {
        ((sum / count as f64) as f32, true)
    } else {
        (0.0, false)
    }
}

/// Mean and population stddev over the active observations, in f64.
/// `None` when no observation is active.
fn mean_stddev(column: &[f32], active: &[bool]) -> Option<(f64, f64)> {
    let mut sum = 0.0f64;
    let mut count = 0u32;
    for (i, &v) in column.iter().enumerate() {
        if active[i] {
            sum += v as f64;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;

    let mut var_sum = 0.0f64;
    for (i, &v) in column.iter().enumerate() {
        if active[i] {
            let d = v as f64 - mean;
            var_sum += d * d;
        }
    }
    let stddev = (var_sum / count as f64).sqrt();
    Some((mean, stddev))
}
