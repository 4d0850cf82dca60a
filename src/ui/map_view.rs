use std::collections::BTreeSet;

use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints, Points, Polygon};

use crate::color::ClassColors;
use crate::data::model::{CellValue, Geometry, PredictionRecord, SpatialDataset};

// ---------------------------------------------------------------------------
// Map plots (central panel)
// ---------------------------------------------------------------------------

const OUTLINE: Stroke = Stroke {
    width: 1.0,
    color: Color32::BLACK,
};

/// Render the plain spatial overview map.
pub fn plain_map(ui: &mut Ui, spatial: &SpatialDataset) {
    let view = view_box(spatial);
    Plot::new("overview_map")
        .data_aspect(1.0)
        .include_x(view.0)
        .include_x(view.1)
        .include_y(view.2)
        .include_y(view.3)
        .show(ui, |plot_ui| {
            for feature in &spatial.features {
                draw_geometry(plot_ui, &feature.geometry, Color32::LIGHT_BLUE, None);
            }
        });
}

/// Render the choropleth-style prediction map: each feature filled by its
/// predicted class colour, with a legend and a hover tooltip naming the
/// class. `predictions` must already be row-aligned with `spatial`.
pub fn prediction_map(ui: &mut Ui, spatial: &SpatialDataset, predictions: &PredictionRecord) {
    let classes: BTreeSet<CellValue> = predictions.predicted.iter().cloned().collect();
    let colors = ClassColors::new(&classes);

    let view = view_box(spatial);
    let response = Plot::new("prediction_map")
        .data_aspect(1.0)
        .include_x(view.0)
        .include_x(view.1)
        .include_y(view.2)
        .include_y(view.3)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            let mut hovered: Option<String> = None;
            let pointer = plot_ui.pointer_coordinate();

            for (feature, class) in spatial.features.iter().zip(&predictions.predicted) {
                let color = colors.color_for(class);
                draw_geometry(plot_ui, &feature.geometry, color, Some(class.to_string()));

                if let Some(p) = pointer {
                    if feature.geometry.contains([p.x, p.y]) {
                        hovered = Some(class.to_string());
                    }
                }
            }
            hovered
        });

    if let Some(class) = response.inner {
        response
            .response
            .on_hover_text(format!("Predicted: {class}"));
    }
}

/// Initial view centred on the centroid of the unioned geometry, wide
/// enough to hold the whole layer: `(x_min, x_max, y_min, y_max)`.
/// Symmetric half-extents about the centroid keep it in the middle even
/// when the bounding box is lopsided.
fn view_box(spatial: &SpatialDataset) -> (f64, f64, f64, f64) {
    let (Some([cx, cy]), Some((min, max))) = (spatial.centroid(), spatial.bounds()) else {
        return (-1.0, 1.0, -1.0, 1.0);
    };
    let half_x = (max[0] - cx).abs().max((cx - min[0]).abs()).max(1e-6) * 1.1;
    let half_y = (max[1] - cy).abs().max((cy - min[1]).abs()).max(1e-6) * 1.1;
    (cx - half_x, cx + half_x, cy - half_y, cy + half_y)
}

fn draw_geometry(
    plot_ui: &mut egui_plot::PlotUi,
    geometry: &Geometry,
    color: Color32,
    name: Option<String>,
) {
    match geometry {
        Geometry::Point(c) => {
            let mut points = Points::new(PlotPoints::from(vec![*c]))
                .radius(5.0)
                .color(color);
            if let Some(n) = &name {
                points = points.name(n);
            }
            plot_ui.points(points);
        }
        Geometry::LineString(coords) => {
            let mut line = Line::new(PlotPoints::from(coords.clone()))
                .color(color)
                .width(2.0);
            if let Some(n) = &name {
                line = line.name(n);
            }
            plot_ui.line(line);
        }
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => {
            for ring in geometry.outer_rings() {
                let mut polygon = Polygon::new(PlotPoints::from(ring.to_vec()))
                    .fill_color(color.gamma_multiply(0.6))
                    .stroke(OUTLINE);
                if let Some(n) = &name {
                    polygon = polygon.name(n);
                }
                plot_ui.polygon(polygon);
            }
        }
    }
}
