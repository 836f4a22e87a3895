use ndarray::Zip;
use tracing::debug;

use crate::tile::Tile;

/// Invalidate every sample strictly greater than `threshold`.
///
/// Values at or below the threshold (zero and negatives included) are left
/// untouched. The sample itself is not rewritten; the validity mask is the
/// source of truth, so re-applying the same threshold is a no-op.
pub fn apply_threshold(tile: &mut Tile, threshold: f32) {
    let mut masked = 0usize;
    Zip::from(&tile.values)
        .and(&mut tile.valid)
        .for_each(|&v, ok| {
            if *ok && v > threshold {
                *ok = false;
                masked += 1;
            }
        });
    debug!(
        path = %tile.metadata.path.display(),
        threshold,
        masked,
        "Threshold mask applied"
    );
}
