use std::path::Path;

use ndarray::{Array2, Array3};

use strata_core::io::geotiff_writer::write_geotiff;
use strata_core::tile::{
    Aggregate, GeoTag, TagValue, Tile, TileMetadata, TAG_GEO_ASCII_PARAMS,
    TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT,
};

/// Metadata with enough georeferencing (pixel scale + tiepoint) to pass the
/// output-metadata check.
pub fn geo_meta(name: &str, bands: u32, height: u32, width: u32) -> TileMetadata {
    TileMetadata {
        path: Path::new(name).to_path_buf(),
        width,
        height,
        bands,
        nodata: None,
        geo: vec![
            GeoTag {
                tag: TAG_MODEL_PIXEL_SCALE,
                value: TagValue::Double(vec![10.0, 10.0, 0.0]),
            },
            GeoTag {
                tag: TAG_MODEL_TIEPOINT,
                value: TagValue::Double(vec![0.0, 0.0, 0.0, 440720.0, 3751320.0, 0.0]),
            },
            GeoTag {
                tag: TAG_GEO_ASCII_PARAMS,
                value: TagValue::Ascii("WGS 84 / UTM zone 11N".into()),
            },
        ],
    }
}

/// Metadata without any georeferencing tags.
pub fn bare_meta(name: &str, bands: u32, height: u32, width: u32) -> TileMetadata {
    TileMetadata {
        path: Path::new(name).to_path_buf(),
        width,
        height,
        bands,
        nodata: None,
        geo: vec![],
    }
}

/// Tile filled with a constant value, all samples valid.
pub fn make_tile(name: &str, bands: usize, height: usize, width: usize, fill: f32) -> Tile {
    let values = Array3::from_elem((bands, height, width), fill);
    Tile::from_values(
        values,
        geo_meta(name, bands as u32, height as u32, width as u32),
    )
}

/// Single-band tile from a 2-D plane.
pub fn band_tile(name: &str, plane: Array2<f32>) -> Tile {
    let (h, w) = plane.dim();
    let values = plane.insert_axis(ndarray::Axis(0));
    Tile::from_values(values, geo_meta(name, 1, h as u32, w as u32))
}

/// Write a float32 GeoTIFF input for end-to-end tests. NaN samples come back
/// as missing.
pub fn write_test_tiff(path: &Path, values: Array3<f32>) {
    let (b, h, w) = values.dim();
    let valid = values.mapv(f32::is_finite);
    let aggregate = Aggregate { values, valid };
    let meta = geo_meta(
        path.to_str().unwrap_or("test"),
        b as u32,
        h as u32,
        w as u32,
    );
    write_geotiff(path, &aggregate, &meta).expect("test tiff written");
}
