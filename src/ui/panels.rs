use eframe::egui::{self, Color32, RichText, Ui};

use crate::workflow::{Stage, WorkflowSession};

use super::{Step, UiState};

// ---------------------------------------------------------------------------
// Left side panel – workflow navigation
// ---------------------------------------------------------------------------

/// Render the navigation panel: one entry per workflow step, with a
/// readiness marker for the slots each step depends on.
pub fn nav_panel(ui: &mut Ui, ui_state: &mut UiState, session: &WorkflowSession) {
    ui.heading("Workflow");
    ui.separator();

    for step in Step::ALL {
        let ready = step_ready(step, session);
        let marker = if ready { "●" } else { "○" };
        let text = format!("{marker} {}", step.label());
        if ui
            .selectable_label(ui_state.step == step, text)
            .clicked()
        {
            ui_state.step = step;
            ui_state.status = None;
        }
    }

    ui.separator();
    ui.label(RichText::new("Session").strong());
    slot_line(ui, "Tabular data", session.tabular().map(|t| t.len()));
    slot_line(ui, "Spatial data", session.spatial().map(|s| s.len()));
    slot_line(ui, "Split", session.split().map(|s| s.len()));
    match session.model() {
        Some(model) => ui.label(format!("✔ Model ({})", model.kind)),
        None => ui.label(RichText::new("✖ Model").weak()),
    };
}

/// Whether a step's prerequisites are met. Purely informational: the
/// session re-checks every guard when the action runs.
fn step_ready(step: Step, session: &WorkflowSession) -> bool {
    match step {
        Step::LoadData => true,
        Step::DisplayMaps => session.spatial_loaded(),
        Step::VariableSelection => session.stage() >= Stage::TabularLoaded,
        Step::TrainModel => session.stage() >= Stage::SplitReady,
        Step::PredictionMap => session.spatial_loaded() && session.predictions_available(),
    }
}

fn slot_line(ui: &mut Ui, name: &str, rows: Option<usize>) {
    match rows {
        Some(n) => ui.label(format!("✔ {name} ({n})")),
        None => ui.label(RichText::new(format!("✖ {name}")).weak()),
    };
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top bar: app title plus the current status line.
pub fn top_bar(ui: &mut Ui, ui_state: &UiState, session: &WorkflowSession) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.strong("Rusty Levee – Flood Hazard Studio");
        ui.separator();

        if let Some(tabular) = session.tabular() {
            ui.label(format!("{} rows", tabular.len()));
        }
        if let Some(spatial) = session.spatial() {
            ui.label(format!("{} features", spatial.len()));
        }

        if let Some(status) = &ui_state.status {
            ui.separator();
            let color = if status.is_advisory {
                Color32::from_rgb(0xcc, 0x88, 0x00)
            } else {
                Color32::from_rgb(0x2e, 0x8b, 0x2e)
            };
            ui.label(RichText::new(&status.text).color(color));
        }
    });
}
