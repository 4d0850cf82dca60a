use eframe::egui::{self, Color32, RichText, Ui};

use crate::ml::metrics::{ConfusionMatrix, Evaluation};

// ---------------------------------------------------------------------------
// Metric readout + confusion-matrix heatmap
// ---------------------------------------------------------------------------

/// Render one partition's evaluation: the four headline numbers followed by
/// the confusion matrix drawn as a heatmap.
pub fn evaluation(ui: &mut Ui, title: &str, eval: &Evaluation) {
    ui.strong(title);
    egui::Grid::new(format!("{title}_metrics"))
        .num_columns(2)
        .spacing([24.0, 4.0])
        .show(ui, |ui: &mut Ui| {
            metric_row(ui, "Accuracy", eval.accuracy);
            metric_row(ui, "Precision", eval.precision);
            metric_row(ui, "Recall", eval.recall);
            metric_row(ui, "F1 Score", eval.f1);
        });
    ui.add_space(6.0);
    heatmap(ui, title, &eval.confusion);
}

fn metric_row(ui: &mut Ui, name: &str, value: f64) {
    ui.label(name);
    ui.label(RichText::new(format!("{value:.3}")).strong());
    ui.end_row();
}

/// Confusion matrix as a grid of shaded cells: rows are actual classes,
/// columns predicted, shade scaled by the largest cell.
fn heatmap(ui: &mut Ui, title: &str, confusion: &ConfusionMatrix) {
    let max = confusion.max_count().max(1);

    ui.label("Confusion Matrix (rows: actual, columns: predicted)");
    egui::Grid::new(format!("{title}_confusion"))
        .spacing([2.0, 2.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("");
            for label in &confusion.labels {
                ui.label(RichText::new(label.to_string()).strong());
            }
            ui.end_row();

            for (i, label) in confusion.labels.iter().enumerate() {
                ui.label(RichText::new(label.to_string()).strong());
                for &count in &confusion.counts[i] {
                    let shade = count as f32 / max as f32;
                    let fill = heat_color(shade);
                    let text = if shade > 0.6 {
                        Color32::WHITE
                    } else {
                        Color32::BLACK
                    };
                    egui::Frame::new()
                        .fill(fill)
                        .inner_margin(egui::Margin::symmetric(10, 6))
                        .show(ui, |ui: &mut Ui| {
                            ui.label(RichText::new(count.to_string()).color(text));
                        });
                }
                ui.end_row();
            }
        });
}

/// White → blue ramp, like the usual confusion-matrix rendering.
fn heat_color(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f32, b: f32| (a + (b - a) * t) as u8;
    Color32::from_rgb(lerp(255.0, 25.0), lerp(255.0, 80.0), lerp(255.0, 160.0))
}
