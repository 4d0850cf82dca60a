use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::data::model::TabularDataset;
use crate::ml::model::ModelKind;
use crate::workflow::{WorkflowSession, TEST_SIZE_RANGE};

use super::{map_view, metrics_view, StatusLine, Step, UiState};

// ---------------------------------------------------------------------------
// Central panel – content for the selected workflow step
// ---------------------------------------------------------------------------

/// Render the current step's content.
pub fn central(ui: &mut Ui, session: &mut WorkflowSession, ui_state: &mut UiState) {
    match ui_state.step {
        Step::LoadData => load_data(ui, session, ui_state),
        Step::DisplayMaps => display_maps(ui, session),
        Step::VariableSelection => variable_selection(ui, session, ui_state),
        Step::TrainModel => train_model(ui, session, ui_state),
        Step::PredictionMap => prediction_map(ui, session),
    }
}

// ---- 1. Load Data ---------------------------------------------------------

fn load_data(ui: &mut Ui, session: &mut WorkflowSession, ui_state: &mut UiState) {
    ui.heading("Upload Your Data");
    ui.add_space(8.0);

    if ui.button("Load tabular CSV…").clicked() {
        let file = rfd::FileDialog::new()
            .set_title("Open tabular data")
            .add_filter("CSV", &["csv"])
            .pick_file();
        if let Some(path) = file {
            match session.load_tabular(&path) {
                Ok(()) => {
                    // Old selections may reference columns that no longer
                    // exist; start the picker fresh.
                    ui_state.target = None;
                    ui_state.features.clear();
                    ui_state.status = Some(StatusLine::success("Tabular data loaded."));
                }
                Err(e) => {
                    log::error!("Failed to load tabular file: {e:#}");
                    ui_state.status = Some(StatusLine::advisory(format!("{e:#}")));
                }
            }
        }
    }

    // The .shp filter is offered on purpose: picking one produces the
    // advisory explaining that shapefiles must arrive zipped.
    if ui.button("Load spatial data…").clicked() {
        let file = rfd::FileDialog::new()
            .set_title("Open spatial data")
            .add_filter("Spatial files", &["geojson", "json", "zip", "shp"])
            .pick_file();
        if let Some(path) = file {
            match session.load_spatial(&path) {
                Ok(()) => ui_state.status = Some(StatusLine::success("Spatial data loaded.")),
                Err(e) => {
                    log::error!("Failed to load spatial file: {e:#}");
                    ui_state.status = Some(StatusLine::advisory(format!("{e:#}")));
                }
            }
        }
    }

    ui.add_space(12.0);
    if let Some(tabular) = session.tabular() {
        ui.strong("Tabular preview");
        table_head(ui, tabular, 5);
    }
    if let Some(spatial) = session.spatial() {
        ui.add_space(8.0);
        ui.strong("Spatial summary");
        ui.label(format!(
            "{} features, attributes: {}",
            spatial.len(),
            spatial.attribute_columns().join(", ")
        ));
    }
}

/// First `n` rows of the table, like the original's `df.head()` preview.
fn table_head(ui: &mut Ui, tabular: &TabularDataset, n: usize) {
    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        egui::Grid::new("tabular_head")
            .striped(true)
            .show(ui, |ui: &mut Ui| {
                for col in &tabular.columns {
                    ui.label(RichText::new(col).strong());
                }
                ui.end_row();
                for row in tabular.rows.iter().take(n) {
                    for cell in row {
                        ui.label(cell.to_string());
                    }
                    ui.end_row();
                }
            });
    });
}

// ---- 2. Display Maps ------------------------------------------------------

fn display_maps(ui: &mut Ui, session: &WorkflowSession) {
    ui.heading("Map View");
    match session.spatial() {
        Some(spatial) => map_view::plain_map(ui, spatial),
        None => advisory(ui, "Please upload spatial data in the previous step."),
    }
}

// ---- 3. Variable Selection ------------------------------------------------

fn variable_selection(ui: &mut Ui, session: &mut WorkflowSession, ui_state: &mut UiState) {
    ui.heading("Variable Selection and Train/Test Split");

    let Some(tabular) = session.tabular() else {
        advisory(ui, "Upload tabular data first.");
        return;
    };
    let columns = tabular.columns.clone();

    ui.add_space(8.0);
    ui.strong("Target variable");
    let current_target = ui_state.target.clone().unwrap_or_default();
    egui::ComboBox::from_id_salt("target_column")
        .selected_text(&current_target)
        .show_ui(ui, |ui: &mut Ui| {
            for col in &columns {
                if ui
                    .selectable_label(current_target == *col, col)
                    .clicked()
                {
                    ui_state.target = Some(col.clone());
                    // A column cannot be both target and feature.
                    ui_state.features.remove(col);
                }
            }
        });

    ui.add_space(8.0);
    ui.strong("Independent variables");
    for col in &columns {
        if Some(col) == ui_state.target.as_ref() {
            continue;
        }
        let mut checked = ui_state.features.contains(col);
        if ui.checkbox(&mut checked, col).changed() {
            if checked {
                ui_state.features.insert(col.clone());
            } else {
                ui_state.features.remove(col);
            }
        }
    }

    ui.add_space(8.0);
    ui.strong("Test size (%)");
    ui.add(
        egui::Slider::new(&mut ui_state.test_size_pct, TEST_SIZE_RANGE)
            .step_by(5.0)
            .suffix("%"),
    );

    ui.add_space(12.0);
    if ui.button("Prepare split").clicked() {
        let Some(target) = ui_state.target.clone() else {
            ui_state.status = Some(StatusLine::advisory("Select a target variable."));
            return;
        };
        let features: Vec<String> = ui_state.features.iter().cloned().collect();
        match session.select_features(&target, &features, ui_state.test_size_pct) {
            Ok(()) => {
                ui_state.status =
                    Some(StatusLine::success("Features and train-test split prepared."));
            }
            Err(e) => ui_state.status = Some(StatusLine::advisory(e.to_string())),
        }
    }

    if let Some(split) = session.split() {
        ui.add_space(8.0);
        ui.label(format!(
            "Split ready: {} train rows, {} test rows on target '{}'",
            split.train_features.len(),
            split.test_features.len(),
            split.target_name
        ));
    }
}

// ---- 4. Train Model -------------------------------------------------------

fn train_model(ui: &mut Ui, session: &mut WorkflowSession, ui_state: &mut UiState) {
    ui.heading("Select and Train Model");

    if session.split().is_none() {
        advisory(ui, "Perform variable selection first.");
        return;
    }

    ui.add_space(8.0);
    egui::ComboBox::from_id_salt("model_kind")
        .selected_text(ui_state.model_kind.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for kind in ModelKind::ALL {
                ui.selectable_value(&mut ui_state.model_kind, kind, kind.to_string());
            }
        });

    if ui.button("Train Model").clicked() {
        match session.train(ui_state.model_kind) {
            Ok(()) => {
                ui_state.status =
                    Some(StatusLine::success("Model trained; predictions saved."));
            }
            Err(e) => ui_state.status = Some(StatusLine::advisory(e.to_string())),
        }
    }

    ui.add_space(12.0);
    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        if let Some(eval) = session.train_eval() {
            metrics_view::evaluation(ui, "Training Evaluation", eval);
            ui.add_space(12.0);
        }
        if let Some(eval) = session.test_eval() {
            metrics_view::evaluation(ui, "Testing Evaluation", eval);
        }
    });
}

// ---- 5. Prediction Map ----------------------------------------------------

fn prediction_map(ui: &mut Ui, session: &WorkflowSession) {
    ui.heading("Prediction Map");

    match session.prediction_overlay() {
        Ok(record) => {
            // prediction_overlay only succeeds when spatial data exists.
            let spatial = session.spatial().expect("guarded by prediction_overlay");
            map_view::prediction_map(ui, spatial, &record);
        }
        Err(e) => advisory(ui, &e.to_string()),
    }
}

// ---- shared ---------------------------------------------------------------

fn advisory(ui: &mut Ui, text: &str) {
    ui.add_space(8.0);
    ui.label(RichText::new(format!("⚠ {text}")).color(egui::Color32::from_rgb(0xcc, 0x88, 0x00)));
}
