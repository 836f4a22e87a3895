use std::path::PathBuf;

use ndarray::{Array2, Array3, Axis};

use crate::error::{Result, StrataError};

/// TIFF tag: pixel scale of the model grid (GeoTIFF).
pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
/// TIFF tag: raster/model tiepoints (GeoTIFF).
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
/// TIFF tag: full model transformation matrix (GeoTIFF).
pub const TAG_MODEL_TRANSFORMATION: u16 = 34264;
/// TIFF tag: GeoKey directory (GeoTIFF).
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
/// TIFF tag: GeoKey double parameters (GeoTIFF).
pub const TAG_GEO_DOUBLE_PARAMS: u16 = 34736;
/// TIFF tag: GeoKey ASCII parameters (GeoTIFF).
pub const TAG_GEO_ASCII_PARAMS: u16 = 34737;
/// TIFF tag: GDAL metadata XML.
pub const TAG_GDAL_METADATA: u16 = 42112;
/// TIFF tag: GDAL nodata value (ASCII).
pub const TAG_GDAL_NODATA: u16 = 42113;

/// Georeferencing tags carried through from input to output unchanged.
pub const CARRIED_GEO_TAGS: [u16; 8] = [
    TAG_MODEL_PIXEL_SCALE,
    TAG_MODEL_TIEPOINT,
    TAG_MODEL_TRANSFORMATION,
    TAG_GEO_KEY_DIRECTORY,
    TAG_GEO_DOUBLE_PARAMS,
    TAG_GEO_ASCII_PARAMS,
    TAG_GDAL_METADATA,
    TAG_GDAL_NODATA,
];

/// Decoded value of a preserved TIFF tag.
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Double(Vec<f64>),
    Ascii(String),
}

/// One georeferencing IFD entry, preserved verbatim for round-tripping.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoTag {
    pub tag: u16,
    pub value: TagValue,
}

/// Metadata of a decoded raster tile.
#[derive(Clone, Debug)]
pub struct TileMetadata {
    /// Source file path.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bands: u32,
    /// Nodata value declared by the source file, if any.
    pub nodata: Option<f32>,
    /// Georeferencing tags in ascending tag order.
    pub geo: Vec<GeoTag>,
}

impl TileMetadata {
    /// Whether the metadata carries enough georeferencing to place an output
    /// raster: either a transformation matrix, or pixel scale + tiepoint.
    pub fn is_georeferenced(&self) -> bool {
        let has = |tag: u16| self.geo.iter().any(|g| g.tag == tag);
        has(TAG_MODEL_TRANSFORMATION)
            || (has(TAG_MODEL_PIXEL_SCALE) && has(TAG_MODEL_TIEPOINT))
    }

    /// Derive output metadata: identical to the reference except for the band
    /// count. Fails if the reference cannot georeference an output file.
    pub fn for_output(&self, bands: u32) -> Result<TileMetadata> {
        if !self.is_georeferenced() {
            return Err(StrataError::Metadata(format!(
                "reference tile {} carries no georeferencing (need a model \
                 transformation, or pixel scale + tiepoint)",
                self.path.display()
            )));
        }
        let mut meta = self.clone();
        meta.bands = bands;
        Ok(meta)
    }
}

/// A single decoded input raster.
///
/// `values` holds the samples as f32, shape = (bands, height, width).
/// `valid` is the same shape; missingness is tracked here explicitly, never
/// by comparing against NaN.
#[derive(Clone, Debug)]
pub struct Tile {
    pub values: Array3<f32>,
    pub valid: Array3<bool>,
    pub metadata: TileMetadata,
}

impl Tile {
    pub fn new(values: Array3<f32>, valid: Array3<bool>, metadata: TileMetadata) -> Self {
        debug_assert_eq!(values.dim(), valid.dim());
        Self {
            values,
            valid,
            metadata,
        }
    }

    /// Build a tile whose validity is derived from sample finiteness.
    pub fn from_values(values: Array3<f32>, metadata: TileMetadata) -> Self {
        let valid = values.mapv(f32::is_finite);
        Self {
            values,
            valid,
            metadata,
        }
    }

    /// (bands, height, width)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.values.dim()
    }

    pub fn bands(&self) -> usize {
        self.values.dim().0
    }

    pub fn height(&self) -> usize {
        self.values.dim().1
    }

    pub fn width(&self) -> usize {
        self.values.dim().2
    }
}

/// Result of an aggregation pass over a stack: one value per (band, row, col),
/// with a validity mask for coordinates where no observation survived.
#[derive(Clone, Debug)]
pub struct Aggregate {
    pub values: Array3<f32>,
    pub valid: Array3<bool>,
}

impl Aggregate {
    /// (bands, height, width)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.values.dim()
    }

    pub fn bands(&self) -> usize {
        self.values.dim().0
    }

    /// Values with invalid coordinates replaced by NaN, the on-disk encoding
    /// of missing samples.
    pub fn masked_values(&self) -> Array3<f32> {
        let mut out = self.values.clone();
        ndarray::Zip::from(&mut out)
            .and(&self.valid)
            .for_each(|v, &ok| {
                if !ok {
                    *v = f32::NAN;
                }
            });
        out
    }

    /// Owned copy of a band plane with invalid coordinates as NaN.
    pub fn masked_band(&self, index: usize) -> Array2<f32> {
        self.masked_values().index_axis_move(Axis(0), index)
    }
}
