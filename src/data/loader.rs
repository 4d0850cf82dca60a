use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result as AnyResult};
use serde_json::Value as JsonValue;

use crate::error::{Result, WorkflowError};

use super::model::{
    CellValue, Coord, Geometry, PredictionRecord, SpatialDataset, SpatialFeature,
    TabularDataset,
};
use super::shapefile;

/// File name for persisted training-partition predictions.
pub const TRAIN_PREDICTIONS_FILE: &str = "predictions_train.csv";
/// File name for persisted test-partition predictions.
pub const TEST_PREDICTIONS_FILE: &str = "predictions_test.csv";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a CSV file. Header row gives column names;
/// each cell's type is guessed from its text.
pub fn load_tabular(path: &Path) -> Result<TabularDataset> {
    let dataset = read_csv(path).context("loading tabular CSV")?;
    log::info!(
        "Loaded {} rows with columns {:?}",
        dataset.len(),
        dataset.columns
    );
    Ok(dataset)
}

/// Load a spatial dataset.  Dispatch by extension.
///
/// Supported formats:
/// * `.geojson` / `.json` – GeoJSON FeatureCollection, Feature or geometry
/// * `.zip`     – archive containing a shapefile set (`.shp` + optional `.dbf`)
/// * `.shp`     – rejected: sidecar files cannot accompany a single upload
pub fn load_spatial(path: &Path) -> Result<SpatialDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "geojson" | "json" => {
            let text = std::fs::read_to_string(path).context("reading GeoJSON file")?;
            parse_geojson(&text).context("parsing GeoJSON")?
        }
        "zip" => {
            let bytes = std::fs::read(path).context("reading zip archive")?;
            load_zipped_shapefile(&bytes)?
        }
        "shp" => {
            return Err(WorkflowError::UnsupportedFormat(
                "a bare .shp file cannot be read alone (it needs its sibling \
                 index/attribute files); upload the shapefile set as a .zip archive"
                    .to_string(),
            ));
        }
        other => {
            return Err(WorkflowError::UnsupportedFormat(format!(
                "unrecognised spatial file extension: .{other}"
            )));
        }
    };

    log::info!(
        "Loaded {} spatial features with attributes {:?}",
        dataset.len(),
        dataset.attribute_columns()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> AnyResult<TabularDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != columns.len() {
            bail!(
                "CSV row {row_no} has {} fields, expected {}",
                record.len(),
                columns.len()
            );
        }
        rows.push(record.iter().map(CellValue::parse).collect());
    }
    Ok(TabularDataset::new(columns, rows))
}

// ---------------------------------------------------------------------------
// GeoJSON loader
// ---------------------------------------------------------------------------

/// Parse GeoJSON text into a [`SpatialDataset`].  Feature properties become
/// attribute columns; feature order is preserved.
pub fn parse_geojson(text: &str) -> AnyResult<SpatialDataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let kind = root
        .get("type")
        .and_then(|t| t.as_str())
        .context("missing top-level 'type'")?;

    let features = match kind {
        "FeatureCollection" => {
            let list = root
                .get("features")
                .and_then(|f| f.as_array())
                .context("FeatureCollection without 'features' array")?;
            list.iter()
                .enumerate()
                .map(|(i, f)| parse_feature(f).with_context(|| format!("feature {i}")))
                .collect::<AnyResult<Vec<_>>>()?
        }
        "Feature" => vec![parse_feature(&root)?],
        _ => vec![SpatialFeature {
            geometry: parse_geometry(&root)?,
            attributes: BTreeMap::new(),
        }],
    };

    Ok(SpatialDataset::new(features))
}

fn parse_feature(value: &JsonValue) -> AnyResult<SpatialFeature> {
    let geometry = value
        .get("geometry")
        .context("feature without geometry")
        .and_then(parse_geometry)?;

    let mut attributes = BTreeMap::new();
    if let Some(props) = value.get("properties").and_then(|p| p.as_object()) {
        for (key, val) in props {
            attributes.insert(key.clone(), json_to_cell(val));
        }
    }
    Ok(SpatialFeature {
        geometry,
        attributes,
    })
}

fn parse_geometry(value: &JsonValue) -> AnyResult<Geometry> {
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .context("geometry without 'type'")?;
    let coords = value
        .get("coordinates")
        .context("geometry without 'coordinates'")?;

    match kind {
        "Point" => Ok(Geometry::Point(json_coord(coords)?)),
        "LineString" => Ok(Geometry::LineString(json_coord_list(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(json_rings(coords)?)),
        "MultiPolygon" => {
            let arr = coords.as_array().context("MultiPolygon coordinates")?;
            let polys = arr
                .iter()
                .map(json_rings)
                .collect::<AnyResult<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(polys))
        }
        other => bail!("unsupported geometry type '{other}'"),
    }
}

fn json_coord(value: &JsonValue) -> AnyResult<Coord> {
    let arr = value.as_array().context("coordinate is not an array")?;
    if arr.len() < 2 {
        bail!("coordinate has {} components, expected at least 2", arr.len());
    }
    let x = arr[0].as_f64().context("x is not a number")?;
    let y = arr[1].as_f64().context("y is not a number")?;
    Ok([x, y])
}

fn json_coord_list(value: &JsonValue) -> AnyResult<Vec<Coord>> {
    value
        .as_array()
        .context("coordinate list is not an array")?
        .iter()
        .map(json_coord)
        .collect()
}

fn json_rings(value: &JsonValue) -> AnyResult<Vec<Vec<Coord>>> {
    value
        .as_array()
        .context("ring list is not an array")?
        .iter()
        .map(json_coord_list)
        .collect()
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Zipped shapefile loader
// ---------------------------------------------------------------------------

/// Read a shapefile set out of a zip archive held in memory. The archive
/// must contain at least one `.shp` entry; a `.dbf` sharing its stem, when
/// present, supplies attribute columns (joined by record order).
pub fn load_zipped_shapefile(bytes: &[u8]) -> Result<SpatialDataset> {
    let reader = std::io::Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(reader).context("opening zip archive")?;

    let shp_name = archive
        .file_names()
        .find(|n| n.to_ascii_lowercase().ends_with(".shp"))
        .map(|n| n.to_string())
        .ok_or_else(|| {
            WorkflowError::UnsupportedFormat(
                "no .shp file found in the uploaded zip archive".to_string(),
            )
        })?;
    let dbf_name = {
        let stem = &shp_name[..shp_name.len() - 4];
        let wanted = format!("{}.dbf", stem.to_ascii_lowercase());
        archive
            .file_names()
            .find(|n| n.to_ascii_lowercase() == wanted)
            .map(|n| n.to_string())
    };

    let shp_bytes = read_zip_entry(&mut archive, &shp_name)?;
    let geometries =
        shapefile::parse_shp(&shp_bytes).with_context(|| format!("parsing {shp_name}"))?;

    let attributes = match dbf_name {
        Some(name) => {
            let dbf_bytes = read_zip_entry(&mut archive, &name)?;
            shapefile::parse_dbf(&dbf_bytes).with_context(|| format!("parsing {name}"))?
        }
        None => Vec::new(),
    };

    let mut attrs_iter = attributes.into_iter();
    let features = geometries
        .into_iter()
        .map(|geometry| SpatialFeature {
            geometry,
            attributes: attrs_iter.next().unwrap_or_default(),
        })
        .collect();
    Ok(SpatialDataset::new(features))
}

fn read_zip_entry(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("opening zip entry {name}"))?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buf)
        .with_context(|| format!("reading zip entry {name}"))?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Prediction persistence
// ---------------------------------------------------------------------------

/// Write a prediction record as a two-column `Actual,Predicted` CSV.
pub fn save_predictions(path: &Path, record: &PredictionRecord) -> AnyResult<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["Actual", "Predicted"])?;
    for (actual, predicted) in record.actual.iter().zip(&record.predicted) {
        writer.write_record([actual.to_string(), predicted.to_string()])?;
    }
    writer.flush().context("flushing predictions CSV")?;
    Ok(())
}

/// Read a persisted `Actual,Predicted` CSV back into a prediction record.
pub fn load_predictions(path: &Path) -> AnyResult<PredictionRecord> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut actual = Vec::new();
    let mut predicted = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("predictions row {row_no}"))?;
        if record.len() < 2 {
            bail!("predictions row {row_no} has {} fields, expected 2", record.len());
        }
        actual.push(CellValue::parse(&record[0]));
        predicted.push(CellValue::parse(&record[1]));
    }
    Ok(PredictionRecord { actual, predicted })
}
