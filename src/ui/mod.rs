/// UI layer: navigation, per-step widgets, map and metric rendering.
pub mod map_view;
pub mod metrics_view;
pub mod panels;
pub mod steps;

use std::collections::BTreeSet;

use crate::ml::model::ModelKind;

// ---------------------------------------------------------------------------
// Workflow navigation
// ---------------------------------------------------------------------------

/// The five workflow steps shown in the navigation panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    LoadData,
    DisplayMaps,
    VariableSelection,
    TrainModel,
    PredictionMap,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::LoadData,
        Step::DisplayMaps,
        Step::VariableSelection,
        Step::TrainModel,
        Step::PredictionMap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Step::LoadData => "1. Load Data",
            Step::DisplayMaps => "2. Display Maps",
            Step::VariableSelection => "3. Variable Selection",
            Step::TrainModel => "4. Train Model",
            Step::PredictionMap => "5. Prediction Map",
        }
    }
}

// ---------------------------------------------------------------------------
// Transient UI state
// ---------------------------------------------------------------------------

/// Status line shown in the top bar: advisory (amber) or success (green).
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub is_advisory: bool,
}

impl StatusLine {
    pub fn advisory(text: impl Into<String>) -> Self {
        StatusLine {
            text: text.into(),
            is_advisory: true,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        StatusLine {
            text: text.into(),
            is_advisory: false,
        }
    }
}

/// Widget selections that have not yet been applied to the session.
pub struct UiState {
    pub step: Step,
    pub target: Option<String>,
    pub features: BTreeSet<String>,
    pub test_size_pct: u8,
    pub model_kind: ModelKind,
    pub status: Option<StatusLine>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            step: Step::LoadData,
            target: None,
            features: BTreeSet::new(),
            test_size_pct: 30,
            model_kind: ModelKind::RandomForest,
            status: None,
        }
    }
}
