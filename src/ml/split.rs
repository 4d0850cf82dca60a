use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::model::CellValue;

/// Fixed seed so splits (and the forest built on them) reproduce across runs.
pub const SPLIT_SEED: u64 = 42;

// ---------------------------------------------------------------------------
// Split – train/test partition of features and labels
// ---------------------------------------------------------------------------

/// The four derived tables produced by feature selection, plus the column
/// choices that produced them.
#[derive(Debug, Clone)]
pub struct Split {
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub train_features: Vec<Vec<f64>>,
    pub test_features: Vec<Vec<f64>>,
    pub train_labels: Vec<CellValue>,
    pub test_labels: Vec<CellValue>,
}

impl Split {
    /// Total row count across both partitions.
    pub fn len(&self) -> usize {
        self.train_features.len() + self.test_features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deterministically partition rows into train and test subsets.
///
/// Row indices are shuffled with a seeded RNG, then the first
/// `round(n · test_fraction)` go to the test partition (clamped so both
/// partitions stay non-empty whenever `n >= 2`). Identical inputs and seed
/// give identical partitions.
pub fn train_test_split(
    features: Vec<Vec<f64>>,
    labels: Vec<CellValue>,
    test_fraction: f64,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<CellValue>, Vec<CellValue>) {
    assert_eq!(features.len(), labels.len());
    let n = features.len();

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut test_count = (n as f64 * test_fraction).round() as usize;
    if n >= 2 {
        test_count = test_count.clamp(1, n - 1);
    }

    let mut train_x = Vec::with_capacity(n - test_count);
    let mut test_x = Vec::with_capacity(test_count);
    let mut train_y = Vec::with_capacity(n - test_count);
    let mut test_y = Vec::with_capacity(test_count);

    // Move rows out by shuffled order; None markers keep indices stable.
    let mut features: Vec<Option<Vec<f64>>> = features.into_iter().map(Some).collect();
    let mut labels: Vec<Option<CellValue>> = labels.into_iter().map(Some).collect();

    for (rank, &idx) in indices.iter().enumerate() {
        let x = features[idx].take().expect("row moved twice");
        let y = labels[idx].take().expect("label moved twice");
        if rank < test_count {
            test_x.push(x);
            test_y.push(y);
        } else {
            train_x.push(x);
            train_y.push(y);
        }
    }

    (train_x, test_x, train_y, test_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> (Vec<Vec<f64>>, Vec<CellValue>) {
        let features: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i * 2) as f64]).collect();
        let labels: Vec<CellValue> = (0..n).map(|i| CellValue::Integer(i as i64)).collect();
        (features, labels)
    }

    #[test]
    fn partitions_sum_to_original() {
        let (x, y) = rows(100);
        let (train_x, test_x, train_y, test_y) = train_test_split(x, y, 0.3, SPLIT_SEED);
        assert_eq!(train_x.len() + test_x.len(), 100);
        assert_eq!(train_y.len() + test_y.len(), 100);
        // 30% of 100 rows, ±1 for rounding
        assert!((test_x.len() as i64 - 30).abs() <= 1);
        assert!(!train_x.is_empty() && !test_x.is_empty());
    }

    #[test]
    fn same_seed_same_partitions() {
        let (x1, y1) = rows(57);
        let (x2, y2) = rows(57);
        let a = train_test_split(x1, y1, 0.25, SPLIT_SEED);
        let b = train_test_split(x2, y2, 0.25, SPLIT_SEED);
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
        assert_eq!(a.2, b.2);
        assert_eq!(a.3, b.3);
    }

    #[test]
    fn labels_stay_paired_with_rows() {
        let (x, y) = rows(40);
        let (train_x, test_x, train_y, test_y) = train_test_split(x, y, 0.5, 7);
        for (row, label) in train_x.iter().zip(&train_y) {
            assert_eq!(CellValue::Integer(row[0] as i64), *label);
        }
        for (row, label) in test_x.iter().zip(&test_y) {
            assert_eq!(CellValue::Integer(row[0] as i64), *label);
        }
    }

    #[test]
    fn tiny_input_keeps_both_partitions_non_empty() {
        let (x, y) = rows(2);
        let (train_x, test_x, _, _) = train_test_split(x, y, 0.1, SPLIT_SEED);
        assert_eq!(train_x.len(), 1);
        assert_eq!(test_x.len(), 1);
    }
}
