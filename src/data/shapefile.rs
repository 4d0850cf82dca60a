//! Hand-rolled shapefile parsers, no external parsing dependencies.
//!
//! Reads the two members of an ESRI shapefile set this tool needs:
//!
//! * `.shp`: geometry. 100-byte header (big-endian file code 9994,
//!   little-endian shape type), then records of
//!   `(record number BE, content length BE)` followed by a little-endian
//!   shape: Null (0), Point (1), PolyLine (3) or Polygon (5).
//! * `.dbf`: attributes (dBASE III). 32-byte header, 32-byte field
//!   descriptors terminated by `0x0D`, then fixed-width ASCII records
//!   prefixed with a deletion flag.
//!
//! Shapefiles are only ever accepted inside a zip archive: a lone `.shp`
//! stream cannot carry its sibling index/attribute files.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};

use super::model::{CellValue, Coord, Geometry};

const SHP_FILE_CODE: i32 = 9994;
const SHP_HEADER_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Byte cursor
// ---------------------------------------------------------------------------

/// Minimal cursor over a byte slice; every read names its offset on failure.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            bail!(
                "unexpected end of data at offset {} (wanted {n} bytes, {} left)",
                self.pos,
                self.remaining()
            );
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn i32_be(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32_le(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f64_le(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn point(&mut self) -> Result<Coord> {
        Ok([self.f64_le()?, self.f64_le()?])
    }
}

// ---------------------------------------------------------------------------
// .shp geometry
// ---------------------------------------------------------------------------

/// Parse the geometries of a `.shp` main file, in record order.
/// Null shapes are kept as empty polygons so row alignment with the
/// attribute table is preserved.
pub fn parse_shp(bytes: &[u8]) -> Result<Vec<Geometry>> {
    let mut cur = Cursor::new(bytes);
    if bytes.len() < SHP_HEADER_LEN {
        bail!("file too short for a shapefile header ({} bytes)", bytes.len());
    }
    let file_code = cur.i32_be().context("reading shapefile file code")?;
    if file_code != SHP_FILE_CODE {
        bail!("bad shapefile magic: expected {SHP_FILE_CODE}, got {file_code}");
    }
    cur.pos = SHP_HEADER_LEN; // skip the rest of the fixed header

    let mut geometries = Vec::new();
    while cur.remaining() >= 8 {
        let record_no = cur.i32_be()?;
        let content_words = cur.i32_be()?;
        if content_words < 0 {
            bail!("record {record_no} declares negative content length {content_words}");
        }
        let content_len = (content_words as usize) * 2;
        let content = cur
            .take(content_len)
            .with_context(|| format!("record {record_no} content"))?;

        let geometry = parse_shape(content)
            .with_context(|| format!("record {record_no}"))?;
        geometries.push(geometry);
    }
    Ok(geometries)
}

fn parse_shape(content: &[u8]) -> Result<Geometry> {
    let mut cur = Cursor::new(content);
    let shape_type = cur.i32_le().context("shape type")?;
    match shape_type {
        0 => Ok(Geometry::Polygon(Vec::new())), // null shape placeholder
        1 => Ok(Geometry::Point(cur.point()?)),
        3 => {
            let parts = parse_parts(&mut cur)?;
            // Render polylines as one continuous string; parts rarely
            // matter for visual overlay purposes.
            Ok(Geometry::LineString(parts.into_iter().flatten().collect()))
        }
        5 => Ok(assemble_polygon(parse_parts(&mut cur)?)),
        other => bail!("unsupported shape type {other}"),
    }
}

/// Read the shared PolyLine/Polygon body: bbox, part index table, points.
fn parse_parts(cur: &mut Cursor<'_>) -> Result<Vec<Vec<Coord>>> {
    for _ in 0..4 {
        cur.f64_le().context("bounding box")?;
    }
    let num_parts = cur.i32_le().context("part count")?;
    let num_points = cur.i32_le().context("point count")?;
    if num_parts < 0 || num_points < 0 {
        bail!("negative part/point count ({num_parts} parts, {num_points} points)");
    }
    let num_parts = num_parts as usize;
    let num_points = num_points as usize;
    if num_parts * 4 + num_points * 16 > cur.remaining() {
        bail!(
            "{num_parts} parts and {num_points} points exceed the {} bytes left in the record",
            cur.remaining()
        );
    }

    let mut part_starts = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        part_starts.push(cur.i32_le()? as usize);
    }
    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        points.push(cur.point()?);
    }

    let mut parts = Vec::with_capacity(num_parts);
    for (i, &start) in part_starts.iter().enumerate() {
        let end = part_starts.get(i + 1).copied().unwrap_or(num_points);
        if start > end || end > num_points {
            bail!("part {i} spans {start}..{end} of {num_points} points");
        }
        parts.push(points[start..end].to_vec());
    }
    Ok(parts)
}

/// Group polygon rings by winding: shapefile outer rings are clockwise,
/// holes counter-clockwise and attached to the preceding outer ring.
fn assemble_polygon(rings: Vec<Vec<Coord>>) -> Geometry {
    let mut polygons: Vec<Vec<Vec<Coord>>> = Vec::new();
    for ring in rings {
        if signed_area(&ring) <= 0.0 || polygons.is_empty() {
            polygons.push(vec![ring]);
        } else {
            polygons.last_mut().unwrap().push(ring);
        }
    }
    if polygons.len() == 1 {
        Geometry::Polygon(polygons.into_iter().next().unwrap())
    } else {
        Geometry::MultiPolygon(polygons)
    }
}

fn signed_area(ring: &[Coord]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let [x1, y1] = ring[i];
        let [x2, y2] = ring[(i + 1) % n];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

// ---------------------------------------------------------------------------
// .dbf attributes
// ---------------------------------------------------------------------------

struct DbfField {
    name: String,
    kind: u8,
    length: usize,
}

/// Parse a dBASE III attribute table into one attribute map per record,
/// skipping records flagged as deleted.
pub fn parse_dbf(bytes: &[u8]) -> Result<Vec<BTreeMap<String, CellValue>>> {
    if bytes.len() < 32 {
        bail!("file too short for a DBF header ({} bytes)", bytes.len());
    }
    let record_count = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let header_size = u16::from_le_bytes(bytes[8..10].try_into().unwrap()) as usize;
    let record_size = u16::from_le_bytes(bytes[10..12].try_into().unwrap()) as usize;
    if header_size > bytes.len() || record_size == 0 {
        bail!("inconsistent DBF header: header {header_size} B, record {record_size} B");
    }

    // Field descriptors: 32-byte entries from offset 32 until 0x0D.
    let mut fields = Vec::new();
    let mut off = 32;
    while off + 32 <= header_size && bytes[off] != 0x0D {
        let desc = &bytes[off..off + 32];
        let name_end = desc[..11].iter().position(|&b| b == 0).unwrap_or(11);
        let name = String::from_utf8_lossy(&desc[..name_end]).trim().to_string();
        fields.push(DbfField {
            name,
            kind: desc[11],
            length: desc[16] as usize,
        });
        off += 32;
    }
    let fixed_width: usize = 1 + fields.iter().map(|f| f.length).sum::<usize>();
    if fixed_width != record_size {
        bail!("field widths sum to {fixed_width} B but record size is {record_size} B");
    }

    let mut records = Vec::with_capacity(record_count);
    let mut pos = header_size;
    for _ in 0..record_count {
        if pos + record_size > bytes.len() {
            break; // truncated tail; keep what parsed cleanly
        }
        let rec = &bytes[pos..pos + record_size];
        pos += record_size;
        if rec[0] == b'*' {
            continue; // deleted record
        }
        let mut attributes = BTreeMap::new();
        let mut field_off = 1;
        for field in &fields {
            let raw = &rec[field_off..field_off + field.length];
            field_off += field.length;
            let text = String::from_utf8_lossy(raw);
            attributes.insert(field.name.clone(), dbf_value(field.kind, text.trim()));
        }
        records.push(attributes);
    }
    Ok(records)
}

fn dbf_value(kind: u8, text: &str) -> CellValue {
    if text.is_empty() {
        return CellValue::Null;
    }
    match kind {
        b'N' | b'F' => CellValue::parse(text),
        b'L' => match text.as_bytes()[0] {
            b'Y' | b'y' | b'T' | b't' => CellValue::Bool(true),
            b'N' | b'n' | b'F' | b'f' => CellValue::Bool(false),
            _ => CellValue::Null,
        },
        _ => CellValue::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal single-record .shp file in memory.
    fn shp_with_point(x: f64, y: f64) -> Vec<u8> {
        let mut buf = vec![0u8; SHP_HEADER_LEN];
        buf[0..4].copy_from_slice(&SHP_FILE_CODE.to_be_bytes());
        buf[32..36].copy_from_slice(&1i32.to_le_bytes()); // shape type: point

        // record header: number 1, content 10 words (4 + 16 bytes)
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&10i32.to_be_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&x.to_le_bytes());
        buf.extend_from_slice(&y.to_le_bytes());
        buf
    }

    fn shp_with_square() -> Vec<u8> {
        let ring: Vec<[f64; 2]> = vec![
            [0.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [1.0, 0.0],
            [0.0, 0.0],
        ]; // clockwise = shapefile outer ring
        let mut content = Vec::new();
        content.extend_from_slice(&5i32.to_le_bytes());
        for v in [0.0f64, 0.0, 1.0, 1.0] {
            content.extend_from_slice(&v.to_le_bytes());
        }
        content.extend_from_slice(&1i32.to_le_bytes()); // num parts
        content.extend_from_slice(&(ring.len() as i32).to_le_bytes());
        content.extend_from_slice(&0i32.to_le_bytes()); // part start
        for [x, y] in &ring {
            content.extend_from_slice(&x.to_le_bytes());
            content.extend_from_slice(&y.to_le_bytes());
        }

        let mut buf = vec![0u8; SHP_HEADER_LEN];
        buf[0..4].copy_from_slice(&SHP_FILE_CODE.to_be_bytes());
        buf[32..36].copy_from_slice(&5i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        buf.extend_from_slice(&content);
        buf
    }

    /// Build a one-field, two-record dBASE III table in memory.
    fn dbf_with_hazard() -> Vec<u8> {
        let field_len = 8usize;
        let header_size = 32 + 32 + 1;
        let record_size = 1 + field_len;

        let mut buf = vec![0u8; 32];
        buf[0] = 0x03;
        buf[4..8].copy_from_slice(&2u32.to_le_bytes());
        buf[8..10].copy_from_slice(&(header_size as u16).to_le_bytes());
        buf[10..12].copy_from_slice(&(record_size as u16).to_le_bytes());

        let mut desc = vec![0u8; 32];
        desc[..6].copy_from_slice(b"HAZARD");
        desc[11] = b'C';
        desc[16] = field_len as u8;
        buf.extend_from_slice(&desc);
        buf.push(0x0D);

        buf.push(b' ');
        buf.extend_from_slice(b"High    ");
        buf.push(b' ');
        buf.extend_from_slice(b"Low     ");
        buf
    }

    #[test]
    fn point_record_round_trips() {
        let geoms = parse_shp(&shp_with_point(12.5, -3.25)).unwrap();
        assert_eq!(geoms.len(), 1);
        match &geoms[0] {
            Geometry::Point([x, y]) => {
                assert_eq!(*x, 12.5);
                assert_eq!(*y, -3.25);
            }
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn polygon_record_keeps_ring() {
        let geoms = parse_shp(&shp_with_square()).unwrap();
        assert_eq!(geoms.len(), 1);
        match &geoms[0] {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
        let c = geoms[0].centroid().unwrap();
        assert!((c[0] - 0.5).abs() < 1e-12);
        assert!((c[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = shp_with_point(0.0, 0.0);
        buf[0..4].copy_from_slice(&1234i32.to_be_bytes());
        assert!(parse_shp(&buf).is_err());
    }

    #[test]
    fn dbf_attributes_parse() {
        let records = parse_dbf(&dbf_with_hazard()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].get("HAZARD"),
            Some(&CellValue::String("High".to_string()))
        );
        assert_eq!(
            records[1].get("HAZARD"),
            Some(&CellValue::String("Low".to_string()))
        );
    }

    #[test]
    fn truncated_shp_errors() {
        assert!(parse_shp(&[0u8; 10]).is_err());
    }

    #[test]
    fn negative_record_length_errors() {
        let mut buf = vec![0u8; SHP_HEADER_LEN];
        buf[0..4].copy_from_slice(&SHP_FILE_CODE.to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&(-1i32).to_be_bytes());
        assert!(parse_shp(&buf).is_err());
    }

    #[test]
    fn negative_point_count_errors() {
        // Polygon record whose declared point count is negative.
        let mut content = Vec::new();
        content.extend_from_slice(&5i32.to_le_bytes());
        for v in [0.0f64; 4] {
            content.extend_from_slice(&v.to_le_bytes());
        }
        content.extend_from_slice(&1i32.to_le_bytes());
        content.extend_from_slice(&(-7i32).to_le_bytes());

        let mut buf = vec![0u8; SHP_HEADER_LEN];
        buf[0..4].copy_from_slice(&SHP_FILE_CODE.to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        buf.extend_from_slice(&content);
        assert!(parse_shp(&buf).is_err());
    }

    #[test]
    fn oversized_point_count_errors() {
        // Declares far more points than the record holds; must error
        // instead of allocating for them.
        let mut content = Vec::new();
        content.extend_from_slice(&5i32.to_le_bytes());
        for v in [0.0f64; 4] {
            content.extend_from_slice(&v.to_le_bytes());
        }
        content.extend_from_slice(&1i32.to_le_bytes());
        content.extend_from_slice(&i32::MAX.to_le_bytes());

        let mut buf = vec![0u8; SHP_HEADER_LEN];
        buf[0..4].copy_from_slice(&SHP_FILE_CODE.to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        buf.extend_from_slice(&content);
        assert!(parse_shp(&buf).is_err());
    }
}
