use std::collections::BTreeSet;
use std::fmt;

use crate::data::model::CellValue;
use crate::error::{Result, WorkflowError};

use super::forest::{ForestConfig, RandomForest};
use super::split::Split;

// ---------------------------------------------------------------------------
// Model selection and training dispatch
// ---------------------------------------------------------------------------

/// The model families offered in the UI. Only the random forest is wired
/// up; the rest report an unimplemented-feature error when selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    RandomForest,
    DeepLearning,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::RandomForest, ModelKind::DeepLearning];
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::RandomForest => write!(f, "Random Forest"),
            ModelKind::DeepLearning => write!(f, "Deep Learning (coming soon)"),
        }
    }
}

/// A trained classifier bound to the Split it was fitted on, carrying the
/// class labels so predictions come back as the user's own label values.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub kind: ModelKind,
    classes: Vec<CellValue>,
    forest: RandomForest,
}

impl FittedModel {
    /// Train the requested model family on the Split's training partition.
    ///
    /// Any family other than the random forest reports
    /// [`WorkflowError::Unimplemented`], a user-visible advisory rather
    /// than a crash.
    pub fn train(kind: ModelKind, split: &Split, config: &ForestConfig) -> Result<FittedModel> {
        match kind {
            ModelKind::RandomForest => {}
            other => return Err(WorkflowError::Unimplemented(other.to_string())),
        }

        let classes: Vec<CellValue> = split
            .train_labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let class_ids: Vec<usize> = split
            .train_labels
            .iter()
            .map(|label| {
                classes
                    .iter()
                    .position(|c| c == label)
                    .expect("class built from these labels")
            })
            .collect();

        let forest = RandomForest::fit(&split.train_features, &class_ids, classes.len(), config);
        log::info!(
            "Trained {} with {} trees on {} rows, {} classes",
            kind,
            forest.n_trees(),
            split.train_features.len(),
            classes.len()
        );
        Ok(FittedModel {
            kind,
            classes,
            forest,
        })
    }

    /// Predict labels for a feature matrix, one per row.
    pub fn predict(&self, features: &[Vec<f64>]) -> Vec<CellValue> {
        self.forest
            .predict_batch(features)
            .into_iter()
            .map(|id| self.classes[id].clone())
            .collect()
    }

    /// The distinct class labels this model can emit, sorted.
    pub fn classes(&self) -> &[CellValue] {
        &self.classes
    }
}
