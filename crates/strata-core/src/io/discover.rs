use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{OUTPUT_MEAN_FILENAME, OUTPUT_SIGMA_FILENAME};
use crate::error::{Result, StrataError};

/// List the raster inputs in `dir`: regular files with a `.tif`/`.tiff`
/// extension (case-insensitive), sorted lexicographically by path so the
/// reference tile (shape and metadata template) is deterministic across
/// platforms. Strata's own output artifacts are excluded so a re-run in the
/// same folder doesn't ingest previous results.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !ext.eq_ignore_ascii_case("tif") && !ext.eq_ignore_ascii_case("tiff") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name == OUTPUT_MEAN_FILENAME || name == OUTPUT_SIGMA_FILENAME {
                continue;
            }
        }
        paths.push(path);
    }

    paths.sort();
    if paths.is_empty() {
        return Err(StrataError::EmptyStack);
    }

    debug!(dir = %dir.display(), count = paths.len(), "Discovered input rasters");
    Ok(paths)
}
