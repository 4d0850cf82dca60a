use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::data::loader::{self, TEST_PREDICTIONS_FILE, TRAIN_PREDICTIONS_FILE};
use crate::data::model::{PredictionRecord, SpatialDataset, TabularDataset};
use crate::error::{Result, WorkflowError};
use crate::ml::forest::ForestConfig;
use crate::ml::metrics::{self, Evaluation};
use crate::ml::model::{FittedModel, ModelKind};
use crate::ml::split::{train_test_split, Split, SPLIT_SEED};

/// Test-size slider bounds, in percent.
pub const TEST_SIZE_RANGE: std::ops::RangeInclusive<u8> = 10..=50;

// ---------------------------------------------------------------------------
// Workflow session – the step-gated state machine
// ---------------------------------------------------------------------------

/// How far the tabular pipeline has progressed. The spatial side is an
/// independent flag ([`WorkflowSession::spatial_loaded`]): maps can be shown
/// as soon as spatial data exists, regardless of model progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Empty,
    TabularLoaded,
    SplitReady,
    ModelTrained,
}

/// All session state, owned explicitly and passed to each transition.
///
/// Each step's action is only valid once its prerequisite slots are
/// populated; guard failures return a [`WorkflowError`] and leave the
/// session untouched, so the UI can show the message as an advisory and let
/// the user retry.
pub struct WorkflowSession {
    tabular: Option<TabularDataset>,
    spatial: Option<SpatialDataset>,
    split: Option<Split>,
    model: Option<FittedModel>,
    train_predictions: Option<PredictionRecord>,
    test_predictions: Option<PredictionRecord>,
    train_eval: Option<Evaluation>,
    test_eval: Option<Evaluation>,
    forest_config: ForestConfig,
    output_dir: PathBuf,
}

impl Default for WorkflowSession {
    fn default() -> Self {
        WorkflowSession::new(PathBuf::from("outputs"))
    }
}

impl WorkflowSession {
    /// Create a session persisting prediction files under `output_dir`.
    pub fn new(output_dir: PathBuf) -> Self {
        WorkflowSession {
            tabular: None,
            spatial: None,
            split: None,
            model: None,
            train_predictions: None,
            test_predictions: None,
            train_eval: None,
            test_eval: None,
            forest_config: ForestConfig::default(),
            output_dir,
        }
    }

    // ---- derived state -----------------------------------------------------

    pub fn stage(&self) -> Stage {
        if self.model.is_some() {
            Stage::ModelTrained
        } else if self.split.is_some() {
            Stage::SplitReady
        } else if self.tabular.is_some() {
            Stage::TabularLoaded
        } else {
            Stage::Empty
        }
    }

    pub fn spatial_loaded(&self) -> bool {
        self.spatial.is_some()
    }

    pub fn predictions_available(&self) -> bool {
        self.test_predictions.is_some()
    }

    pub fn tabular(&self) -> Option<&TabularDataset> {
        self.tabular.as_ref()
    }

    pub fn spatial(&self) -> Option<&SpatialDataset> {
        self.spatial.as_ref()
    }

    pub fn split(&self) -> Option<&Split> {
        self.split.as_ref()
    }

    pub fn model(&self) -> Option<&FittedModel> {
        self.model.as_ref()
    }

    pub fn train_eval(&self) -> Option<&Evaluation> {
        self.train_eval.as_ref()
    }

    pub fn test_eval(&self) -> Option<&Evaluation> {
        self.test_eval.as_ref()
    }

    pub fn test_predictions_path(&self) -> PathBuf {
        self.output_dir.join(TEST_PREDICTIONS_FILE)
    }

    // ---- transitions -------------------------------------------------------

    /// Load (or replace) the tabular dataset.
    ///
    /// Replacing the dataset cascade-invalidates everything derived from
    /// the old one (split, model, predictions, metrics) so no stale
    /// artifact can outlive its source.
    pub fn load_tabular(&mut self, path: &Path) -> Result<()> {
        let dataset = loader::load_tabular(path)?;
        self.tabular = Some(dataset);
        self.invalidate_derived();
        Ok(())
    }

    /// Load (or replace) the spatial dataset. Independent of tabular
    /// progress.
    pub fn load_spatial(&mut self, path: &Path) -> Result<()> {
        self.spatial = Some(loader::load_spatial(path)?);
        Ok(())
    }

    /// Choose target + features and derive the train/test split.
    pub fn select_features(
        &mut self,
        target: &str,
        features: &[String],
        test_size_pct: u8,
    ) -> Result<()> {
        let Some(tabular) = &self.tabular else {
            return Err(WorkflowError::MissingPrecondition(
                "upload tabular data first".to_string(),
            ));
        };
        if tabular.len() < 2 {
            return Err(WorkflowError::MissingPrecondition(
                "the loaded tabular dataset needs at least two rows to split".to_string(),
            ));
        }
        if features.is_empty() {
            return Err(WorkflowError::InvalidSelection(
                "pick at least one independent variable".to_string(),
            ));
        }
        if features.iter().any(|f| f == target) {
            return Err(WorkflowError::InvalidSelection(format!(
                "target '{target}' cannot also be an independent variable"
            )));
        }
        if !TEST_SIZE_RANGE.contains(&test_size_pct) {
            return Err(WorkflowError::InvalidSelection(format!(
                "test size {test_size_pct}% is outside {}–{}%",
                TEST_SIZE_RANGE.start(),
                TEST_SIZE_RANGE.end()
            )));
        }

        // Column-wise extraction validates existence and numeric type
        // before anything is mutated.
        let mut columns = Vec::with_capacity(features.len());
        for name in features {
            columns.push(tabular.numeric_column(name)?);
        }
        let labels = tabular.column_values(target)?;

        let n = tabular.len();
        let feature_rows: Vec<Vec<f64>> = (0..n)
            .map(|row| columns.iter().map(|col| col[row]).collect())
            .collect();

        let (train_x, test_x, train_y, test_y) = train_test_split(
            feature_rows,
            labels,
            f64::from(test_size_pct) / 100.0,
            SPLIT_SEED,
        );

        self.split = Some(Split {
            feature_names: features.to_vec(),
            target_name: target.to_string(),
            train_features: train_x,
            test_features: test_x,
            train_labels: train_y,
            test_labels: test_y,
        });
        // New split, old model no longer matches it.
        self.model = None;
        self.train_predictions = None;
        self.test_predictions = None;
        self.train_eval = None;
        self.test_eval = None;
        Ok(())
    }

    /// Train the selected model family on the current split, evaluate both
    /// partitions, and persist the prediction records to the output
    /// directory.
    pub fn train(&mut self, kind: ModelKind) -> Result<()> {
        let Some(split) = &self.split else {
            return Err(WorkflowError::MissingPrecondition(
                "perform variable selection first".to_string(),
            ));
        };

        let model = FittedModel::train(kind, split, &self.forest_config)?;

        let train_predictions = PredictionRecord {
            actual: split.train_labels.clone(),
            predicted: model.predict(&split.train_features),
        };
        let test_predictions = PredictionRecord {
            actual: split.test_labels.clone(),
            predicted: model.predict(&split.test_features),
        };

        let train_eval = metrics::evaluate(
            &train_predictions.actual,
            &train_predictions.predicted,
        );
        let test_eval = metrics::evaluate(
            &test_predictions.actual,
            &test_predictions.predicted,
        );

        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating {}", self.output_dir.display()))?;
        let train_path = self.output_dir.join(TRAIN_PREDICTIONS_FILE);
        loader::save_predictions(&train_path, &train_predictions)?;
        if let Err(e) = loader::save_predictions(&self.test_predictions_path(), &test_predictions) {
            // The persisted files only make sense as a pair.
            let _ = std::fs::remove_file(&train_path);
            return Err(e.into());
        }

        self.train_eval = Some(train_eval);
        self.test_eval = Some(test_eval);
        self.model = Some(model);
        self.train_predictions = Some(train_predictions);
        self.test_predictions = Some(test_predictions);
        Ok(())
    }

    /// Fetch the persisted test predictions for the prediction map.
    ///
    /// Valid only once both spatial data and predictions exist, the
    /// persisted file is present, and its row count matches the spatial
    /// feature count.
    pub fn prediction_overlay(&self) -> Result<PredictionRecord> {
        let Some(spatial) = &self.spatial else {
            return Err(WorkflowError::MissingPrecondition(
                "upload spatial data first".to_string(),
            ));
        };
        if !self.predictions_available() {
            return Err(WorkflowError::MissingPrecondition(
                "train a model first so prediction results exist".to_string(),
            ));
        }
        let path = self.test_predictions_path();
        if !path.exists() {
            return Err(WorkflowError::MissingPrecondition(format!(
                "prediction file {} is missing",
                path.display()
            )));
        }

        let record = loader::load_predictions(&path)?;
        if record.len() != spatial.len() {
            return Err(WorkflowError::ShapeMismatch {
                spatial: spatial.len(),
                predictions: record.len(),
            });
        }
        Ok(record)
    }

    fn invalidate_derived(&mut self) {
        self.split = None;
        self.model = None;
        self.train_predictions = None;
        self.test_predictions = None;
        self.train_eval = None;
        self.test_eval = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    /// A CSV where hazard is perfectly determined by rainfall.
    fn sample_csv(rows: usize) -> String {
        let mut out = String::from("rainfall,slope,hazard\n");
        for i in 0..rows {
            let rainfall = if i % 2 == 0 { 20.0 } else { 180.0 };
            let hazard = if i % 2 == 0 { "Low" } else { "High" };
            writeln!(out, "{},{},{}", rainfall + i as f64 * 0.01, i % 7, hazard).unwrap();
        }
        out
    }

    fn session_with_csv(rows: usize) -> (WorkflowSession, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("data.csv");
        std::fs::write(&csv_path, sample_csv(rows)).unwrap();

        let mut session = WorkflowSession::new(dir.path().join("outputs"));
        session.load_tabular(&csv_path).unwrap();
        (session, dir)
    }

    fn feature_names() -> Vec<String> {
        vec!["rainfall".to_string(), "slope".to_string()]
    }

    #[test]
    fn select_before_load_is_a_missing_precondition() {
        let mut session = WorkflowSession::default();
        let err = session
            .select_features("hazard", &feature_names(), 30)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingPrecondition(_)));
        assert_eq!(session.stage(), Stage::Empty);
    }

    #[test]
    fn split_partitions_sum_and_respect_percentage() {
        let (mut session, _dir) = session_with_csv(100);
        session
            .select_features("hazard", &feature_names(), 30)
            .unwrap();
        assert_eq!(session.stage(), Stage::SplitReady);

        let split = session.split().unwrap();
        assert_eq!(split.len(), 100);
        assert!(!split.train_features.is_empty());
        assert!(!split.test_features.is_empty());
        assert!((split.test_features.len() as i64 - 30).abs() <= 1);
        assert_eq!(split.train_labels.len(), split.train_features.len());
        assert_eq!(split.test_labels.len(), split.test_features.len());
    }

    #[test]
    fn single_row_dataset_cannot_be_split() {
        // At 50% a lone row would land entirely in the test partition and
        // leave nothing to train on.
        let (mut session, _dir) = session_with_csv(1);
        let err = session
            .select_features("hazard", &feature_names(), 50)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingPrecondition(_)));
        assert_eq!(session.stage(), Stage::TabularLoaded);

        let err = session.train(ModelKind::RandomForest).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingPrecondition(_)));
    }

    #[test]
    fn failed_prediction_write_leaves_no_partial_pair() {
        let (mut session, _dir) = session_with_csv(40);
        session
            .select_features("hazard", &feature_names(), 30)
            .unwrap();

        // A directory squatting the test-predictions file name makes the
        // second CSV write fail after the first succeeded.
        std::fs::create_dir_all(session.test_predictions_path()).unwrap();
        assert!(session.train(ModelKind::RandomForest).is_err());

        assert_eq!(session.stage(), Stage::SplitReady);
        assert!(session.train_eval().is_none());
        assert!(!session.output_dir.join(TRAIN_PREDICTIONS_FILE).exists());
    }

    #[test]
    fn target_overlapping_features_is_rejected() {
        let (mut session, _dir) = session_with_csv(20);
        let err = session
            .select_features("hazard", &["hazard".to_string()], 30)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidSelection(_)));
        assert_eq!(session.stage(), Stage::TabularLoaded);
    }

    #[test]
    fn out_of_range_test_size_is_rejected() {
        let (mut session, _dir) = session_with_csv(20);
        let err = session
            .select_features("hazard", &feature_names(), 55)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidSelection(_)));
    }

    #[test]
    fn non_numeric_feature_is_a_column_error() {
        let (mut session, _dir) = session_with_csv(20);
        let err = session
            .select_features("rainfall", &["hazard".to_string()], 30)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Column { .. }));
    }

    #[test]
    fn train_produces_matching_length_predictions_and_files() {
        let (mut session, _dir) = session_with_csv(60);
        session
            .select_features("hazard", &feature_names(), 30)
            .unwrap();
        session.train(ModelKind::RandomForest).unwrap();

        assert_eq!(session.stage(), Stage::ModelTrained);
        assert!(session.predictions_available());
        let split = session.split().unwrap();
        assert_eq!(
            session.train_predictions.as_ref().unwrap().len(),
            split.train_labels.len()
        );
        assert_eq!(
            session.test_predictions.as_ref().unwrap().len(),
            split.test_labels.len()
        );
        assert!(session.test_predictions_path().exists());
        assert!(session.train_eval().is_some());
        assert!(session.test_eval().is_some());
    }

    #[test]
    fn unimplemented_model_leaves_state_unchanged() {
        let (mut session, _dir) = session_with_csv(40);
        session
            .select_features("hazard", &feature_names(), 30)
            .unwrap();

        let err = session.train(ModelKind::DeepLearning).unwrap_err();
        assert!(matches!(err, WorkflowError::Unimplemented(_)));
        assert_eq!(session.stage(), Stage::SplitReady);
        assert!(!session.predictions_available());
        assert!(!session.test_predictions_path().exists());
    }

    #[test]
    fn train_before_selection_is_a_missing_precondition() {
        let (mut session, _dir) = session_with_csv(40);
        let err = session.train(ModelKind::RandomForest).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingPrecondition(_)));
    }

    #[test]
    fn reloading_tabular_cascades_invalidation() {
        let (mut session, dir) = session_with_csv(60);
        session
            .select_features("hazard", &feature_names(), 30)
            .unwrap();
        session.train(ModelKind::RandomForest).unwrap();
        assert_eq!(session.stage(), Stage::ModelTrained);

        let csv_path = dir.path().join("fresh.csv");
        std::fs::write(&csv_path, sample_csv(30)).unwrap();
        session.load_tabular(&csv_path).unwrap();

        assert_eq!(session.stage(), Stage::TabularLoaded);
        assert!(session.split().is_none());
        assert!(session.model().is_none());
        assert!(!session.predictions_available());
    }

    #[test]
    fn prediction_overlay_requires_matching_row_counts() {
        let (mut session, dir) = session_with_csv(60);
        session
            .select_features("hazard", &feature_names(), 30)
            .unwrap();
        session.train(ModelKind::RandomForest).unwrap();

        // Spatial layer with a different feature count than the test split.
        let geojson = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{}},
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1,1]},"properties":{}}
        ]}"#;
        let geo_path = dir.path().join("regions.geojson");
        std::fs::write(&geo_path, geojson).unwrap();
        session.load_spatial(&geo_path).unwrap();

        let err = session.prediction_overlay().unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::ShapeMismatch {
                spatial: 2,
                predictions: _
            }
        ));
    }

    #[test]
    fn prediction_overlay_without_spatial_is_gated() {
        let (session, _dir) = session_with_csv(20);
        let err = session.prediction_overlay().unwrap_err();
        assert!(matches!(err, WorkflowError::MissingPrecondition(_)));
    }
}
