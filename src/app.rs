use eframe::egui;

use crate::ui::{panels, steps, UiState};
use crate::workflow::WorkflowSession;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct LeveeApp {
    pub session: WorkflowSession,
    pub ui_state: UiState,
}

impl Default for LeveeApp {
    fn default() -> Self {
        Self {
            session: WorkflowSession::default(),
            ui_state: UiState::default(),
        }
    }
}

impl eframe::App for LeveeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: title + status line ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.ui_state, &self.session);
        });

        // ---- Left side panel: workflow navigation ----
        egui::SidePanel::left("nav_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::nav_panel(ui, &mut self.ui_state, &self.session);
            });

        // ---- Central panel: current step ----
        egui::CentralPanel::default().show(ctx, |ui| {
            steps::central(ui, &mut self.session, &mut self.ui_state);
        });
    }
}
