//! End-to-end workflow runs: load files from disk, walk every step of the
//! session, and check the persisted artifacts.

use std::fmt::Write as _;
use std::path::Path;

use rusty_levee::error::WorkflowError;
use rusty_levee::ml::model::ModelKind;
use rusty_levee::workflow::{Stage, WorkflowSession};

/// 100-row CSV where hazard is perfectly separable on rainfall.
fn write_sample_csv(path: &Path) {
    let mut out = String::from("rainfall,slope,hazard\n");
    for i in 0..100 {
        let rainfall = if i % 2 == 0 { 25.0 } else { 175.0 };
        let hazard = if i % 2 == 0 { "Low" } else { "High" };
        writeln!(out, "{},{},{}", rainfall + i as f64 * 0.01, i % 5, hazard).unwrap();
    }
    std::fs::write(path, out).unwrap();
}

/// GeoJSON grid with `n` square features.
fn write_regions_geojson(path: &Path, n: usize) {
    let features: Vec<String> = (0..n)
        .map(|i| {
            let x = i as f64;
            format!(
                r#"{{"type":"Feature","geometry":{{"type":"Polygon",
                   "coordinates":[[[{x},0],[{x1},0],[{x1},1],[{x},1],[{x},0]]]}},
                   "properties":{{"cell_id":{i}}}}}"#,
                x = x,
                x1 = x + 1.0,
                i = i
            )
        })
        .collect();
    let text = format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    );
    std::fs::write(path, text).unwrap();
}

#[test]
fn full_pipeline_from_files_to_prediction_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("data.csv");
    let geo_path = dir.path().join("regions.geojson");
    write_sample_csv(&csv_path);
    // 30% of 100 rows land in the test partition.
    write_regions_geojson(&geo_path, 30);

    let mut session = WorkflowSession::new(dir.path().join("outputs"));
    assert_eq!(session.stage(), Stage::Empty);

    session.load_tabular(&csv_path).unwrap();
    session.load_spatial(&geo_path).unwrap();
    assert_eq!(session.stage(), Stage::TabularLoaded);
    assert!(session.spatial_loaded());

    session
        .select_features("hazard", &["rainfall".to_string(), "slope".to_string()], 30)
        .unwrap();
    assert_eq!(session.stage(), Stage::SplitReady);

    session.train(ModelKind::RandomForest).unwrap();
    assert_eq!(session.stage(), Stage::ModelTrained);

    // Perfectly separable data: the forest must nail both partitions.
    assert_eq!(session.train_eval().unwrap().accuracy, 1.0);
    assert_eq!(session.test_eval().unwrap().accuracy, 1.0);

    let overlay = session.prediction_overlay().unwrap();
    assert_eq!(overlay.len(), 30);
    assert_eq!(overlay.actual.len(), overlay.predicted.len());
}

#[test]
fn persisted_predictions_are_identical_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("data.csv");
    write_sample_csv(&csv_path);

    let run = |out: &Path| {
        let mut session = WorkflowSession::new(out.to_path_buf());
        session.load_tabular(&csv_path).unwrap();
        session
            .select_features("hazard", &["rainfall".to_string(), "slope".to_string()], 30)
            .unwrap();
        session.train(ModelKind::RandomForest).unwrap();
        std::fs::read_to_string(session.test_predictions_path()).unwrap()
    };

    let first = run(&dir.path().join("out_a"));
    let second = run(&dir.path().join("out_b"));
    assert_eq!(first, second);
}

#[test]
fn mismatched_spatial_layer_blocks_the_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("data.csv");
    let geo_path = dir.path().join("regions.geojson");
    write_sample_csv(&csv_path);
    write_regions_geojson(&geo_path, 7); // not 30

    let mut session = WorkflowSession::new(dir.path().join("outputs"));
    session.load_tabular(&csv_path).unwrap();
    session.load_spatial(&geo_path).unwrap();
    session
        .select_features("hazard", &["rainfall".to_string(), "slope".to_string()], 30)
        .unwrap();
    session.train(ModelKind::RandomForest).unwrap();

    let err = session.prediction_overlay().unwrap_err();
    match err {
        WorkflowError::ShapeMismatch {
            spatial,
            predictions,
        } => {
            assert_eq!(spatial, 7);
            assert_eq!(predictions, 30);
        }
        other => panic!("expected ShapeMismatch, got {other}"),
    }
}
