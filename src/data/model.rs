use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::WorkflowError;

// ---------------------------------------------------------------------------
// CellValue – a single cell in a tabular or attribute column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value: tabular data arrives with user-chosen
/// column names and no compile-time schema, so cells carry their own type.
/// Used in `BTreeMap` / `BTreeSet` downstream, hence the manual `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw textual cell. Used by every textual
    /// ingestion path (CSV, DBF) so identical text always compares equal.
    pub fn parse(s: &str) -> CellValue {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::String(s.to_string())
    }

    /// Try to interpret the value as an `f64` for use as a model feature.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TabularDataset – named-column table of observations
// ---------------------------------------------------------------------------

/// A parsed table: ordered column names plus one `Vec<CellValue>` per row,
/// each exactly `columns.len()` long.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl TabularDataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        TabularDataset { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, or a taxonomy error naming it.
    pub fn column_index(&self, name: &str) -> Result<usize, WorkflowError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| WorkflowError::Column {
                column: name.to_string(),
                reason: "not present in the loaded dataset".to_string(),
            })
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Result<Vec<CellValue>, WorkflowError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// One column as `f64`s, validating numeric compatibility up front so a
    /// bad pick fails here with a clear message instead of mid-training.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, WorkflowError> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                r[idx].as_f64().ok_or_else(|| WorkflowError::Column {
                    column: name.to_string(),
                    reason: format!("row {row} holds non-numeric value '{}'", r[idx]),
                })
            })
            .collect()
    }

    /// Sorted set of distinct values in a column.
    pub fn unique_values(&self, name: &str) -> Result<BTreeSet<CellValue>, WorkflowError> {
        Ok(self.column_values(name)?.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Geometry – the shapes a spatial feature can carry
// ---------------------------------------------------------------------------

/// A 2D coordinate, (x, y) = (longitude, latitude).
pub type Coord = [f64; 2];

/// Geometry of one spatial feature. Polygons hold one or more rings; the
/// first ring is the outer boundary, the rest are holes.
#[derive(Debug, Clone)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

impl Geometry {
    /// All coordinates in the geometry, in drawing order.
    pub fn coords(&self) -> Vec<Coord> {
        match self {
            Geometry::Point(c) => vec![*c],
            Geometry::LineString(line) => line.clone(),
            Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
            Geometry::MultiPolygon(polys) => {
                polys.iter().flatten().flatten().copied().collect()
            }
        }
    }

    /// Outer rings suitable for filled rendering (empty for points/lines).
    pub fn outer_rings(&self) -> Vec<&[Coord]> {
        match self {
            Geometry::Polygon(rings) => {
                rings.first().map(|r| r.as_slice()).into_iter().collect()
            }
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .filter_map(|rings| rings.first().map(|r| r.as_slice()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Total unsigned shoelace area over outer rings (0 for points/lines).
    pub fn area(&self) -> f64 {
        self.outer_rings().iter().map(|r| ring_area(r).abs()).sum()
    }

    /// Centroid of this geometry: area centroid for polygons, vertex mean
    /// otherwise. `None` for an empty geometry.
    pub fn centroid(&self) -> Option<Coord> {
        let rings = self.outer_rings();
        if !rings.is_empty() {
            let mut area_sum = 0.0;
            let mut cx = 0.0;
            let mut cy = 0.0;
            for ring in rings {
                let a = ring_area(ring).abs();
                let (x, y) = ring_centroid(ring);
                area_sum += a;
                cx += x * a;
                cy += y * a;
            }
            if area_sum > f64::EPSILON {
                return Some([cx / area_sum, cy / area_sum]);
            }
        }
        let coords = self.coords();
        if coords.is_empty() {
            return None;
        }
        let n = coords.len() as f64;
        let (sx, sy) = coords
            .iter()
            .fold((0.0, 0.0), |(sx, sy), c| (sx + c[0], sy + c[1]));
        Some([sx / n, sy / n])
    }

    /// Whether a point lies inside this geometry (ray casting over outer
    /// rings; points and lines never contain anything).
    pub fn contains(&self, point: Coord) -> bool {
        self.outer_rings()
            .iter()
            .any(|ring| point_in_ring(point, ring))
    }
}

fn ring_area(ring: &[Coord]) -> f64 {
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

fn ring_centroid(ring: &[Coord]) -> (f64, f64) {
    let a = ring_area(ring);
    if a.abs() < f64::EPSILON {
        // Degenerate ring: vertex mean.
        let n = ring.len().max(1) as f64;
        let (sx, sy) = ring
            .iter()
            .fold((0.0, 0.0), |(sx, sy), c| (sx + c[0], sy + c[1]));
        return (sx / n, sy / n);
    }
    let n = ring.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let [x1, y1] = ring[i];
        let [x2, y2] = ring[(i + 1) % n];
        let cross = x1 * y2 - x2 * y1;
        cx += (x1 + x2) * cross;
        cy += (y1 + y2) * cross;
    }
    (cx / (6.0 * a), cy / (6.0 * a))
}

fn point_in_ring(point: Coord, ring: &[Coord]) -> bool {
    let [px, py] = point;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// ---------------------------------------------------------------------------
// SpatialDataset – geometries with attribute columns
// ---------------------------------------------------------------------------

/// One geometry plus its attribute columns.
#[derive(Debug, Clone)]
pub struct SpatialFeature {
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, CellValue>,
}

/// The full parsed spatial layer, feature order preserved from the file.
/// Prediction rows are joined back by this order.
#[derive(Debug, Clone)]
pub struct SpatialDataset {
    pub features: Vec<SpatialFeature>,
}

impl SpatialDataset {
    pub fn new(features: Vec<SpatialFeature>) -> Self {
        SpatialDataset { features }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Attribute column names present anywhere in the layer, sorted.
    pub fn attribute_columns(&self) -> Vec<String> {
        let set: BTreeSet<String> = self
            .features
            .iter()
            .flat_map(|f| f.attributes.keys().cloned())
            .collect();
        set.into_iter().collect()
    }

    /// Centroid of the unioned geometry: area-weighted mean of the feature
    /// centroids, falling back to a plain mean where nothing has area.
    pub fn centroid(&self) -> Option<Coord> {
        let mut weighted = (0.0, 0.0);
        let mut area_sum = 0.0;
        let mut plain = (0.0, 0.0);
        let mut plain_n = 0usize;

        for feat in &self.features {
            let Some([cx, cy]) = feat.geometry.centroid() else {
                continue;
            };
            let a = feat.geometry.area();
            if a > f64::EPSILON {
                weighted.0 += cx * a;
                weighted.1 += cy * a;
                area_sum += a;
            }
            plain.0 += cx;
            plain.1 += cy;
            plain_n += 1;
        }

        if area_sum > f64::EPSILON {
            Some([weighted.0 / area_sum, weighted.1 / area_sum])
        } else if plain_n > 0 {
            Some([plain.0 / plain_n as f64, plain.1 / plain_n as f64])
        } else {
            None
        }
    }

    /// Bounding box as ([min_x, min_y], [max_x, max_y]).
    pub fn bounds(&self) -> Option<(Coord, Coord)> {
        let mut min = [f64::INFINITY, f64::INFINITY];
        let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        let mut seen = false;
        for feat in &self.features {
            for [x, y] in feat.geometry.coords() {
                min[0] = min[0].min(x);
                min[1] = min[1].min(y);
                max[0] = max[0].max(x);
                max[1] = max[1].max(y);
                seen = true;
            }
        }
        seen.then_some((min, max))
    }
}

// ---------------------------------------------------------------------------
// PredictionRecord – paired actual/predicted labels for one partition
// ---------------------------------------------------------------------------

/// Actual and predicted label pairs for one train or test partition,
/// persisted as an `Actual,Predicted` CSV after training and read back by
/// the prediction-map step.
#[derive(Debug, Clone)]
pub struct PredictionRecord {
    pub actual: Vec<CellValue>,
    pub predicted: Vec<CellValue>,
}

impl PredictionRecord {
    /// Number of label pairs.
    pub fn len(&self) -> usize {
        self.predicted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicted.is_empty()
    }
}
