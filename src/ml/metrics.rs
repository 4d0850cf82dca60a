use std::collections::BTreeSet;

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Classification metrics – accuracy, weighted P/R/F1, confusion matrix
// ---------------------------------------------------------------------------

/// Confusion matrix over the sorted set of observed true-label classes.
/// `counts[i][j]` is the number of rows with actual class `labels[i]` and
/// predicted class `labels[j]`; predictions outside the true-label set fall
/// off the matrix but still count against accuracy.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    pub labels: Vec<CellValue>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Largest single cell, used to scale the heatmap.
    pub fn max_count(&self) -> usize {
        self.counts
            .iter()
            .flat_map(|row| row.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }
}

/// Metric bundle for one partition.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

/// Evaluate predicted against actual labels.
///
/// Precision/recall/F1 are support-weighted averages over the observed
/// true-label classes; classes with zero predicted (or true) instances
/// contribute 0 instead of dividing by zero.
///
/// # Panics
///
/// Panics if the two sequences differ in length; callers pair them by
/// construction.
pub fn evaluate(actual: &[CellValue], predicted: &[CellValue]) -> Evaluation {
    assert_eq!(actual.len(), predicted.len(), "label sequences must pair up");
    let n = actual.len();

    let labels: Vec<CellValue> = actual
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index_of = |v: &CellValue| labels.iter().position(|l| l == v);

    let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
    let mut correct = 0usize;
    for (a, p) in actual.iter().zip(predicted) {
        if a == p {
            correct += 1;
        }
        if let (Some(i), Some(j)) = (index_of(a), index_of(p)) {
            counts[i][j] += 1;
        }
    }

    let mut precision = 0.0;
    let mut recall = 0.0;
    let mut f1 = 0.0;
    for i in 0..labels.len() {
        let support: usize = counts[i].iter().sum();
        let true_pos = counts[i][i];
        let predicted_as: usize = (0..labels.len()).map(|r| counts[r][i]).sum();

        let p = if predicted_as == 0 {
            0.0
        } else {
            true_pos as f64 / predicted_as as f64
        };
        let r = if support == 0 {
            0.0
        } else {
            true_pos as f64 / support as f64
        };
        let f = if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        };

        let weight = support as f64 / n.max(1) as f64;
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }

    Evaluation {
        accuracy: if n == 0 { 0.0 } else { correct as f64 / n as f64 },
        precision,
        recall,
        f1,
        confusion: ConfusionMatrix { labels, counts },
    }
}
