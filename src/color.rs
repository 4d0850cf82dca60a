use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Hazard ramp + generated extension
// ---------------------------------------------------------------------------

/// The classic hazard ramp: the first four classes, in sorted order, get
/// these colours so low/high hazard reads at a glance.
const HAZARD_RAMP: [Color32; 4] = [
    Color32::from_rgb(0x2e, 0xcc, 0x40), // green
    Color32::from_rgb(0xff, 0xdc, 0x00), // yellow
    Color32::from_rgb(0xff, 0x85, 0x1b), // orange
    Color32::from_rgb(0xff, 0x41, 0x36), // red
];

/// Generates `n` visually distinct colours using evenly spaced hues.
/// Used for classes past the fixed ramp so any class count renders with a
/// legend entry instead of silently falling back to one neutral colour.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Class → colour mapping with legend
// ---------------------------------------------------------------------------

/// Maps distinct predicted class values to fill colours.
#[derive(Debug, Clone)]
pub struct ClassColors {
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ClassColors {
    /// Build the mapping for a sorted set of distinct predicted classes:
    /// ramp colours first, generated hues for the remainder.
    pub fn new(classes: &BTreeSet<CellValue>) -> Self {
        let extra = classes.len().saturating_sub(HAZARD_RAMP.len());
        let generated = generate_palette(extra);
        let palette = HAZARD_RAMP.iter().copied().chain(generated);

        let mapping: BTreeMap<CellValue, Color32> =
            classes.iter().cloned().zip(palette).collect();

        ClassColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a predicted class (gray when unmapped).
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Legend entries (class label → colour), in class-sort order.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(v, c)| (v.to_string(), *c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(names: &[&str]) -> BTreeSet<CellValue> {
        names
            .iter()
            .map(|n| CellValue::String((*n).to_string()))
            .collect()
    }

    #[test]
    fn ramp_covers_first_four_classes() {
        let colors = ClassColors::new(&classes(&["a", "b", "c", "d"]));
        let legend = colors.legend_entries();
        assert_eq!(legend.len(), 4);
        for (i, (_, c)) in legend.iter().enumerate() {
            assert_eq!(*c, HAZARD_RAMP[i]);
        }
    }

    #[test]
    fn fifth_class_still_gets_a_legend_entry() {
        let set = classes(&["a", "b", "c", "d", "e"]);
        let colors = ClassColors::new(&set);
        assert_eq!(colors.legend_entries().len(), 5);
        let fifth = colors.color_for(&CellValue::String("e".to_string()));
        assert_ne!(fifth, Color32::GRAY);
        assert!(!HAZARD_RAMP.contains(&fifth));
    }

    #[test]
    fn unmapped_value_is_gray() {
        let colors = ClassColors::new(&classes(&["a"]));
        assert_eq!(
            colors.color_for(&CellValue::String("zzz".to_string())),
            Color32::GRAY
        );
    }
}
