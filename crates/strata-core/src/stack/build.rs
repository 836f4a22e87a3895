use ndarray::{Array4, Axis};
use tracing::debug;

use crate::error::{Result, StrataError};
use crate::tile::Tile;

/// Validated tiles joined along a new leading observation axis.
///
/// Shape = (observation, bands, height, width). The validity mask travels
/// with the values; an element may be missing either because the source file
/// marked it (nodata, non-finite) or because threshold masking cleared it.
#[derive(Clone, Debug)]
pub struct Stack {
    pub values: Array4<f32>,
    pub valid: Array4<bool>,
}

impl Stack {
    /// Assemble a stack from same-shape tiles.
    ///
    /// Consumes the tiles one at a time so each decoded array is released as
    /// soon as it has been folded in; peak memory stays at one stack plus one
    /// tile. Callers must have run shape validation first.
    pub fn from_tiles(tiles: Vec<Tile>) -> Result<Self> {
        let n = tiles.len();
        let (b, h, w) = tiles.first().map(Tile::shape).ok_or(StrataError::EmptyStack)?;

        let mut values = Array4::<f32>::zeros((n, b, h, w));
        let mut valid = Array4::<bool>::from_elem((n, b, h, w), false);

        for (i, tile) in tiles.into_iter().enumerate() {
            debug_assert_eq!(tile.shape(), (b, h, w));
            values.index_axis_mut(Axis(0), i).assign(&tile.values);
            valid.index_axis_mut(Axis(0), i).assign(&tile.valid);
        }

        debug!(observations = n, bands = b, height = h, width = w, "Stack assembled");
        Ok(Self { values, valid })
    }

    /// Number of observations (stacked tiles).
    pub fn observations(&self) -> usize {
        self.values.dim().0
    }

    /// (bands, height, width) of each observation.
    pub fn tile_shape(&self) -> (usize, usize, usize) {
        let (_, b, h, w) = self.values.dim();
        (b, h, w)
    }
}
