use std::path::PathBuf;

use tracing::warn;

use crate::error::{Result, StrataError};
use crate::tile::Tile;

/// Diagnostic for a tile dropped because its shape differs from the
/// reference. Non-fatal: the run continues without the tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeMismatchSkip {
    pub path: PathBuf,
    /// (bands, height, width) of the reference tile.
    pub expected: (usize, usize, usize),
    pub actual: (usize, usize, usize),
}

impl std::fmt::Display for ShapeMismatchSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Skipping {}: shape mismatch, expected {:?}, got {:?}",
            self.path.display(),
            self.expected,
            self.actual
        )
    }
}

/// Filter tiles against the shape of the first one.
///
/// The first tile establishes the reference shape; every later tile either
/// matches it or is dropped with a recorded diagnostic. Returns the surviving
/// tiles in input order. `EmptyStack` if nothing survives (which includes an
/// empty input sequence).
pub fn validate_shapes(tiles: Vec<Tile>) -> Result<(Vec<Tile>, Vec<ShapeMismatchSkip>)> {
    let mut iter = tiles.into_iter();
    let first = iter.next().ok_or(StrataError::EmptyStack)?;
    let reference = first.shape();

    let mut accepted = vec![first];
    let mut skipped = Vec::new();

    for tile in iter {
        let actual = tile.shape();
        if actual == reference {
            accepted.push(tile);
        } else {
            let skip = ShapeMismatchSkip {
                path: tile.metadata.path.clone(),
                expected: reference,
                actual,
            };
            warn!(
                path = %skip.path.display(),
                expected = ?skip.expected,
                actual = ?skip.actual,
                "Shape mismatch, tile skipped"
            );
            skipped.push(skip);
        }
    }

    Ok((accepted, skipped))
}
