use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

use crate::error::{Result, StrataError};
use crate::io::geotiff::{
    TAG_BITS_PER_SAMPLE, TAG_COMPRESSION, TAG_IMAGE_LENGTH, TAG_IMAGE_WIDTH, TAG_PHOTOMETRIC,
    TAG_PLANAR_CONFIG, TAG_ROWS_PER_STRIP, TAG_SAMPLES_PER_PIXEL, TAG_SAMPLE_FORMAT,
    TAG_STRIP_BYTE_COUNTS, TAG_STRIP_OFFSETS, TIFF_MAGIC, TYPE_ASCII, TYPE_DOUBLE, TYPE_LONG,
    TYPE_SHORT,
};
use crate::tile::{Aggregate, GeoTag, TagValue, TileMetadata, TAG_GDAL_NODATA};

const HEADER_SIZE: u32 = 8;
const ENTRY_SIZE: u32 = 12;

/// One IFD entry with its value already serialized little-endian.
struct RawTag {
    tag: u16,
    ftype: u16,
    count: u32,
    bytes: Vec<u8>,
    /// Assigned during layout for values wider than 4 bytes. Always below
    /// the pixel data offset, which is checked to fit 32 bits.
    offset: Option<u64>,
}

impl RawTag {
    fn short(tag: u16, values: &[u16]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 2);
        for &v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Self { tag, ftype: TYPE_SHORT, count: values.len() as u32, bytes, offset: None }
    }

    fn long(tag: u16, values: &[u32]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for &v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Self { tag, ftype: TYPE_LONG, count: values.len() as u32, bytes, offset: None }
    }

    fn double(tag: u16, values: &[f64]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 8);
        for &v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Self { tag, ftype: TYPE_DOUBLE, count: values.len() as u32, bytes, offset: None }
    }

    fn ascii(tag: u16, value: &str) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        Self { tag, ftype: TYPE_ASCII, count: bytes.len() as u32, bytes, offset: None }
    }

    fn from_geo(geo: &GeoTag) -> Self {
        match &geo.value {
            TagValue::Short(v) => Self::short(geo.tag, v),
            TagValue::Long(v) => Self::long(geo.tag, v),
            TagValue::Double(v) => Self::double(geo.tag, v),
            TagValue::Ascii(s) => Self::ascii(geo.tag, s),
        }
    }
}

/// Byte length of a float32 pixel payload, if a classic TIFF (32-bit
/// offsets and byte counts) can carry it.
fn pixel_payload_len(bands: usize, height: usize, width: usize) -> Option<u32> {
    let bytes = bands as u64 * height as u64 * width as u64 * 4;
    u32::try_from(bytes).ok()
}

/// Write an aggregate as a little-endian float32 GeoTIFF.
///
/// Single uncompressed strip, chunky interleave, BlackIsZero photometric.
/// Georeferencing tags come from the reference metadata; GDAL nodata is set
/// to `nan`, matching the NaN encoding of missing coordinates. Overwrites
/// any existing file at `path`.
pub fn write_geotiff(path: &Path, aggregate: &Aggregate, meta: &TileMetadata) -> Result<()> {
    let (bands, height, width) = aggregate.shape();
    debug_assert_eq!(meta.bands as usize, bands);
    debug_assert_eq!(meta.height as usize, height);
    debug_assert_eq!(meta.width as usize, width);

    let data_len = pixel_payload_len(bands, height, width).ok_or_else(|| {
        StrataError::Metadata(format!(
            "raster too large for classic TIFF: {bands}x{height}x{width} float32 \
             exceeds 32-bit strip byte counts"
        ))
    })?;

    let mut tags = vec![
        RawTag::long(TAG_IMAGE_WIDTH, &[width as u32]),
        RawTag::long(TAG_IMAGE_LENGTH, &[height as u32]),
        RawTag::short(TAG_BITS_PER_SAMPLE, &vec![32u16; bands]),
        RawTag::short(TAG_COMPRESSION, &[1]),
        // BlackIsZero
        RawTag::short(TAG_PHOTOMETRIC, &[1]),
        RawTag::long(TAG_STRIP_OFFSETS, &[0]), // patched after layout
        RawTag::short(TAG_SAMPLES_PER_PIXEL, &[bands as u16]),
        RawTag::long(TAG_ROWS_PER_STRIP, &[height as u32]),
        RawTag::long(TAG_STRIP_BYTE_COUNTS, &[data_len]),
        // Chunky interleave
        RawTag::short(TAG_PLANAR_CONFIG, &[1]),
        // IEEE float
        RawTag::short(TAG_SAMPLE_FORMAT, &vec![3u16; bands]),
    ];

    for geo in &meta.geo {
        if geo.tag != TAG_GDAL_NODATA {
            tags.push(RawTag::from_geo(geo));
        }
    }
    tags.push(RawTag::ascii(TAG_GDAL_NODATA, "nan"));

    // IFD entries must be in ascending tag order.
    tags.sort_by_key(|t| t.tag);

    // Layout: header, IFD, out-of-line values (even-aligned), pixel data.
    // Computed in u64; every offset must land below the 32-bit limit.
    let ifd_size = 2 + tags.len() as u64 * ENTRY_SIZE as u64 + 4;
    let mut cursor = HEADER_SIZE as u64 + ifd_size;
    for tag in &mut tags {
        if tag.bytes.len() > 4 {
            cursor += cursor % 2;
            tag.offset = Some(cursor);
            cursor += tag.bytes.len() as u64;
        }
    }
    cursor += cursor % 2;
    let data_offset = u32::try_from(cursor)
        .ok()
        .filter(|&off| off as u64 + data_len as u64 <= u32::MAX as u64)
        .ok_or_else(|| {
            StrataError::Metadata(format!(
                "raster too large for classic TIFF: file would span {} bytes",
                cursor + data_len as u64
            ))
        })?;

    for tag in &mut tags {
        if tag.tag == TAG_STRIP_OFFSETS {
            tag.bytes = data_offset.to_le_bytes().to_vec();
        }
    }

    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    // Header: byte order, magic, first IFD offset
    w.write_all(b"II")?;
    w.write_u16::<LittleEndian>(TIFF_MAGIC)?;
    w.write_u32::<LittleEndian>(HEADER_SIZE)?;

    // IFD
    w.write_u16::<LittleEndian>(tags.len() as u16)?;
    for tag in &tags {
        w.write_u16::<LittleEndian>(tag.tag)?;
        w.write_u16::<LittleEndian>(tag.ftype)?;
        w.write_u32::<LittleEndian>(tag.count)?;
        match tag.offset {
            Some(offset) => w.write_u32::<LittleEndian>(offset as u32)?,
            None => {
                let mut inline = [0u8; 4];
                inline[..tag.bytes.len()].copy_from_slice(&tag.bytes);
                w.write_all(&inline)?;
            }
        }
    }
    // No further IFDs
    w.write_u32::<LittleEndian>(0)?;

    // Out-of-line tag values, padded to their assigned offsets
    let mut pos = HEADER_SIZE as u64 + ifd_size;
    for tag in &tags {
        if let Some(offset) = tag.offset {
            while pos < offset {
                w.write_u8(0)?;
                pos += 1;
            }
            w.write_all(&tag.bytes)?;
            pos += tag.bytes.len() as u64;
        }
    }
    while pos < data_offset as u64 {
        w.write_u8(0)?;
        pos += 1;
    }

    // Pixel data: row-major, bands interleaved, missing as NaN
    let masked = aggregate.masked_values();
    for row in 0..height {
        for col in 0..width {
            for band in 0..bands {
                w.write_f32::<LittleEndian>(masked[[band, row, col]])?;
            }
        }
    }

    w.flush()?;
    debug!(path = %path.display(), bands, height, width, "GeoTIFF written");
    Ok(())
}
