use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use memmap2::Mmap;
use ndarray::Array3;

use crate::error::{Result, StrataError};
use crate::tile::{GeoTag, TagValue, Tile, TileMetadata, CARRIED_GEO_TAGS, TAG_GDAL_NODATA};

pub const TIFF_MAGIC: u16 = 42;

pub const TAG_IMAGE_WIDTH: u16 = 256;
pub const TAG_IMAGE_LENGTH: u16 = 257;
pub const TAG_BITS_PER_SAMPLE: u16 = 258;
pub const TAG_COMPRESSION: u16 = 259;
pub const TAG_PHOTOMETRIC: u16 = 262;
pub const TAG_STRIP_OFFSETS: u16 = 273;
pub const TAG_SAMPLES_PER_PIXEL: u16 = 277;
pub const TAG_ROWS_PER_STRIP: u16 = 278;
pub const TAG_STRIP_BYTE_COUNTS: u16 = 279;
pub const TAG_PLANAR_CONFIG: u16 = 284;
pub const TAG_SAMPLE_FORMAT: u16 = 339;

pub const TYPE_BYTE: u16 = 1;
pub const TYPE_ASCII: u16 = 2;
pub const TYPE_SHORT: u16 = 3;
pub const TYPE_LONG: u16 = 4;
pub const TYPE_SBYTE: u16 = 6;
pub const TYPE_SSHORT: u16 = 8;
pub const TYPE_SLONG: u16 = 9;
pub const TYPE_FLOAT: u16 = 11;
pub const TYPE_DOUBLE: u16 = 12;

const COMPRESSION_NONE: u64 = 1;
const PLANAR_CHUNKY: u64 = 1;
const PLANAR_SEPARATE: u64 = 2;

const SAMPLE_FORMAT_UINT: u64 = 1;
const SAMPLE_FORMAT_INT: u64 = 2;
const SAMPLE_FORMAT_FLOAT: u64 = 3;

/// Byte order of the file, from the header's II/MM marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, b: &[u8]) -> u16 {
        match self {
            Self::Little => LittleEndian::read_u16(b),
            Self::Big => BigEndian::read_u16(b),
        }
    }

    fn u32(self, b: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(b),
            Self::Big => BigEndian::read_u32(b),
        }
    }

    fn i16(self, b: &[u8]) -> i16 {
        match self {
            Self::Little => LittleEndian::read_i16(b),
            Self::Big => BigEndian::read_i16(b),
        }
    }

    fn i32(self, b: &[u8]) -> i32 {
        match self {
            Self::Little => LittleEndian::read_i32(b),
            Self::Big => BigEndian::read_i32(b),
        }
    }

    fn f32(self, b: &[u8]) -> f32 {
        match self {
            Self::Little => LittleEndian::read_f32(b),
            Self::Big => BigEndian::read_f32(b),
        }
    }

    fn f64(self, b: &[u8]) -> f64 {
        match self {
            Self::Little => LittleEndian::read_f64(b),
            Self::Big => BigEndian::read_f64(b),
        }
    }
}

/// One parsed IFD entry with its value bytes resolved (inline or offset).
#[derive(Clone, Debug)]
struct IfdEntry {
    tag: u16,
    ftype: u16,
    count: u32,
    data: Vec<u8>,
}

fn type_size(ftype: u16) -> Option<usize> {
    match ftype {
        TYPE_BYTE | TYPE_ASCII | TYPE_SBYTE | 7 => Some(1),
        TYPE_SHORT | TYPE_SSHORT => Some(2),
        TYPE_LONG | TYPE_SLONG | TYPE_FLOAT => Some(4),
        5 | 10 | TYPE_DOUBLE => Some(8),
        _ => None,
    }
}

/// Supported sample encodings, all decoded to f32.
#[derive(Clone, Copy, Debug)]
enum SampleKind {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl SampleKind {
    fn from_format(format: u64, bits: u64) -> Option<Self> {
        match (format, bits) {
            (SAMPLE_FORMAT_UINT, 8) => Some(Self::U8),
            (SAMPLE_FORMAT_UINT, 16) => Some(Self::U16),
            (SAMPLE_FORMAT_UINT, 32) => Some(Self::U32),
            (SAMPLE_FORMAT_INT, 8) => Some(Self::I8),
            (SAMPLE_FORMAT_INT, 16) => Some(Self::I16),
            (SAMPLE_FORMAT_INT, 32) => Some(Self::I32),
            (SAMPLE_FORMAT_FLOAT, 32) => Some(Self::F32),
            (SAMPLE_FORMAT_FLOAT, 64) => Some(Self::F64),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    fn read(self, b: &[u8], endian: Endian) -> f32 {
        match self {
            Self::U8 => b[0] as f32,
            Self::U16 => endian.u16(b) as f32,
            Self::U32 => endian.u32(b) as f32,
            Self::I8 => b[0] as i8 as f32,
            Self::I16 => endian.i16(b) as f32,
            Self::I32 => endian.i32(b) as f32,
            Self::F32 => endian.f32(b),
            Self::F64 => endian.f64(b) as f32,
        }
    }
}

fn unreadable(path: &Path, reason: impl Into<String>) -> StrataError {
    StrataError::UnreadableFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn slice<'a>(data: &'a [u8], path: &Path, offset: usize, len: usize) -> Result<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| unreadable(path, "offset overflow"))?;
    if end > data.len() {
        return Err(unreadable(
            path,
            format!("truncated: need {} bytes, file has {}", end, data.len()),
        ));
    }
    Ok(&data[offset..end])
}

/// Read a GeoTIFF into a tile: samples decoded to f32 shape (bands, h, w),
/// validity derived from finiteness and the declared nodata value, and the
/// georeferencing tags captured verbatim for round-tripping.
///
/// Supports baseline uncompressed strip layout, both byte orders, chunky and
/// planar interleave, and uint/int/float sample formats up to 64 bits.
pub fn read_geotiff(path: &Path) -> Result<Tile> {
    let file = File::open(path).map_err(|e| unreadable(path, format!("cannot open: {e}")))?;
    let mmap =
        unsafe { Mmap::map(&file) }.map_err(|e| unreadable(path, format!("mmap failed: {e}")))?;
    decode_tiff(&mmap, path)
}

fn decode_tiff(data: &[u8], path: &Path) -> Result<Tile> {
    if data.len() < 8 {
        return Err(unreadable(path, "file too small for TIFF header"));
    }

    let endian = match &data[0..2] {
        b"II" => Endian::Little,
        b"MM" => Endian::Big,
        _ => return Err(unreadable(path, "missing II/MM byte-order marker")),
    };
    if endian.u16(&data[2..4]) != TIFF_MAGIC {
        return Err(unreadable(path, "bad TIFF magic"));
    }

    let ifd_offset = endian.u32(&data[4..8]) as usize;
    let entries = parse_ifd(data, path, endian, ifd_offset)?;

    let find = |tag: u16| entries.iter().find(|e| e.tag == tag);
    let require = |tag: u16, name: &str| {
        find(tag).ok_or_else(|| unreadable(path, format!("missing required tag {name}")))
    };

    let width = first_uint(require(TAG_IMAGE_WIDTH, "ImageWidth")?, endian, path)? as usize;
    let height = first_uint(require(TAG_IMAGE_LENGTH, "ImageLength")?, endian, path)? as usize;
    if width == 0 || height == 0 {
        return Err(unreadable(path, format!("degenerate dimensions {width}x{height}")));
    }

    let bands = match find(TAG_SAMPLES_PER_PIXEL) {
        Some(e) => first_uint(e, endian, path)? as usize,
        None => 1,
    };

    let bits = uniform_uint(find(TAG_BITS_PER_SAMPLE), endian, path, 1, "BitsPerSample")?;
    let format = uniform_uint(
        find(TAG_SAMPLE_FORMAT),
        endian,
        path,
        SAMPLE_FORMAT_UINT,
        "SampleFormat",
    )?;
    let kind = SampleKind::from_format(format, bits).ok_or_else(|| {
        unreadable(
            path,
            format!("unsupported sample encoding: format {format}, {bits} bits"),
        )
    })?;

    let compression = match find(TAG_COMPRESSION) {
        Some(e) => first_uint(e, endian, path)?,
        None => COMPRESSION_NONE,
    };
    if compression != COMPRESSION_NONE {
        return Err(unreadable(
            path,
            format!("unsupported compression scheme {compression}"),
        ));
    }

    let planar = match find(TAG_PLANAR_CONFIG) {
        Some(e) => first_uint(e, endian, path)?,
        None => PLANAR_CHUNKY,
    };

    let rows_per_strip = match find(TAG_ROWS_PER_STRIP) {
        Some(e) => (first_uint(e, endian, path)? as usize).clamp(1, height),
        None => height,
    };
    let strip_offsets = uint_values(require(TAG_STRIP_OFFSETS, "StripOffsets")?, endian, path)?;
    let strip_counts = uint_values(
        require(TAG_STRIP_BYTE_COUNTS, "StripByteCounts")?,
        endian,
        path,
    )?;
    if strip_counts.len() != strip_offsets.len() {
        return Err(unreadable(path, "StripOffsets/StripByteCounts length mismatch"));
    }

    let strips_per_plane = height.div_ceil(rows_per_strip);
    let expected_strips = match planar {
        PLANAR_CHUNKY => strips_per_plane,
        PLANAR_SEPARATE => strips_per_plane * bands,
        other => return Err(unreadable(path, format!("unsupported planar config {other}"))),
    };
    if strip_offsets.len() < expected_strips {
        return Err(unreadable(
            path,
            format!(
                "expected {} strips, file declares {}",
                expected_strips,
                strip_offsets.len()
            ),
        ));
    }

    let mut values = Array3::<f32>::zeros((bands, height, width));
    let sample_size = kind.size();

    if planar == PLANAR_CHUNKY {
        for strip in 0..strips_per_plane {
            let row0 = strip * rows_per_strip;
            let rows = rows_per_strip.min(height - row0);
            let needed = rows * width * bands * sample_size;
            let bytes = resolve_strip(data, path, &strip_offsets, &strip_counts, strip, needed)?;

            let mut idx = 0usize;
            for r in 0..rows {
                for c in 0..width {
                    for band in 0..bands {
                        values[[band, row0 + r, c]] =
                            kind.read(&bytes[idx * sample_size..], endian);
                        idx += 1;
                    }
                }
            }
        }
    } else {
        for band in 0..bands {
            for strip in 0..strips_per_plane {
                let index = band * strips_per_plane + strip;
                let row0 = strip * rows_per_strip;
                let rows = rows_per_strip.min(height - row0);
                let needed = rows * width * sample_size;
                let bytes =
                    resolve_strip(data, path, &strip_offsets, &strip_counts, index, needed)?;

                let mut idx = 0usize;
                for r in 0..rows {
                    for c in 0..width {
                        values[[band, row0 + r, c]] =
                            kind.read(&bytes[idx * sample_size..], endian);
                        idx += 1;
                    }
                }
            }
        }
    }

    let nodata = find(TAG_GDAL_NODATA)
        .and_then(|e| ascii_value(e).trim().parse::<f32>().ok());

    // Missingness is tracked in the mask from here on; the raw samples are
    // never compared against NaN again.
    let valid = values.mapv(|v| v.is_finite() && nodata.map_or(true, |nd| v != nd));

    let geo = collect_geo_tags(&entries, endian);
    let metadata = TileMetadata {
        path: PathBuf::from(path),
        width: width as u32,
        height: height as u32,
        bands: bands as u32,
        nodata,
        geo,
    };

    Ok(Tile::new(values, valid, metadata))
}

fn parse_ifd(data: &[u8], path: &Path, endian: Endian, offset: usize) -> Result<Vec<IfdEntry>> {
    let count_bytes = slice(data, path, offset, 2)?;
    let count = endian.u16(count_bytes) as usize;
    let mut entries = Vec::with_capacity(count);

    for i in 0..count {
        let raw = slice(data, path, offset + 2 + i * 12, 12)?;
        let tag = endian.u16(&raw[0..2]);
        let ftype = endian.u16(&raw[2..4]);
        let value_count = endian.u32(&raw[4..8]);

        let Some(size) = type_size(ftype) else {
            // Unknown field type; skip the entry rather than failing the file.
            continue;
        };
        let total = size
            .checked_mul(value_count as usize)
            .ok_or_else(|| unreadable(path, "tag value size overflow"))?;

        let value_bytes = if total <= 4 {
            raw[8..8 + total].to_vec()
        } else {
            let value_offset = endian.u32(&raw[8..12]) as usize;
            slice(data, path, value_offset, total)?.to_vec()
        };

        entries.push(IfdEntry {
            tag,
            ftype,
            count: value_count,
            data: value_bytes,
        });
    }

    Ok(entries)
}

fn resolve_strip<'a>(
    data: &'a [u8],
    path: &Path,
    offsets: &[u64],
    counts: &[u64],
    index: usize,
    needed: usize,
) -> Result<&'a [u8]> {
    if (counts[index] as usize) < needed {
        return Err(unreadable(
            path,
            format!(
                "strip {} holds {} bytes, need {}",
                index, counts[index], needed
            ),
        ));
    }
    slice(data, path, offsets[index] as usize, needed)
}

fn uint_values(entry: &IfdEntry, endian: Endian, path: &Path) -> Result<Vec<u64>> {
    let n = entry.count as usize;
    let mut out = Vec::with_capacity(n);
    match entry.ftype {
        TYPE_BYTE => {
            for i in 0..n {
                out.push(entry.data[i] as u64);
            }
        }
        TYPE_SHORT => {
            for i in 0..n {
                out.push(endian.u16(&entry.data[i * 2..]) as u64);
            }
        }
        TYPE_LONG => {
            for i in 0..n {
                out.push(endian.u32(&entry.data[i * 4..]) as u64);
            }
        }
        other => {
            return Err(unreadable(
                path,
                format!("tag {} has non-integer type {}", entry.tag, other),
            ))
        }
    }
    Ok(out)
}

fn first_uint(entry: &IfdEntry, endian: Endian, path: &Path) -> Result<u64> {
    uint_values(entry, endian, path)?
        .first()
        .copied()
        .ok_or_else(|| unreadable(path, format!("tag {} is empty", entry.tag)))
}

/// Read a per-sample tag (BitsPerSample, SampleFormat) that must be uniform
/// across bands.
fn uniform_uint(
    entry: Option<&IfdEntry>,
    endian: Endian,
    path: &Path,
    default: u64,
    name: &str,
) -> Result<u64> {
    let Some(entry) = entry else {
        return Ok(default);
    };
    let vals = uint_values(entry, endian, path)?;
    let first = *vals
        .first()
        .ok_or_else(|| unreadable(path, format!("{name} is empty")))?;
    if vals.iter().any(|&v| v != first) {
        return Err(unreadable(path, format!("{name} differs across bands")));
    }
    Ok(first)
}

fn ascii_value(entry: &IfdEntry) -> String {
    let end = entry
        .data
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(entry.data.len());
    String::from_utf8_lossy(&entry.data[..end]).into_owned()
}

fn collect_geo_tags(entries: &[IfdEntry], endian: Endian) -> Vec<GeoTag> {
    let mut geo = Vec::new();
    for &tag in &CARRIED_GEO_TAGS {
        let Some(entry) = entries.iter().find(|e| e.tag == tag) else {
            continue;
        };
        let n = entry.count as usize;
        let value = match entry.ftype {
            TYPE_SHORT => TagValue::Short(
                (0..n).map(|i| endian.u16(&entry.data[i * 2..])).collect(),
            ),
            TYPE_LONG => TagValue::Long(
                (0..n).map(|i| endian.u32(&entry.data[i * 4..])).collect(),
            ),
            TYPE_DOUBLE => TagValue::Double(
                (0..n).map(|i| endian.f64(&entry.data[i * 8..])).collect(),
            ),
            TYPE_ASCII => TagValue::Ascii(ascii_value(entry)),
            _ => continue,
        };
        geo.push(GeoTag { tag, value });
    }
    geo
}
