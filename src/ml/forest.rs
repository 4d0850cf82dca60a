use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::tree::{DecisionTree, TreeConfig};

// ---------------------------------------------------------------------------
// Random forest – bootstrap ensemble with majority voting
// ---------------------------------------------------------------------------

/// Forest-training parameters. Defaults mirror the usual classifier setup:
/// 100 trees, unbounded depth, `sqrt(n_features)` per split, seed 42.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// A trained random forest classifier.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    /// Train a forest on `(features, labels)` where labels are contiguous
    /// class ids in `0..n_classes`.
    ///
    /// Each tree sees a bootstrap sample of the rows and considers
    /// `sqrt(n_features)` candidate features per split. All randomness
    /// derives from `config.seed`, so training is reproducible.
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        config: &ForestConfig,
    ) -> Self {
        assert!(!features.is_empty(), "cannot train a forest on zero samples");
        assert_eq!(features.len(), labels.len());

        let n = features.len();
        let n_features = features[0].len();
        let max_features = (n_features as f64).sqrt().round().max(1.0) as usize;
        let tree_config = TreeConfig {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            max_features: Some(max_features.min(n_features.max(1))),
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let trees = (0..config.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                DecisionTree::fit(features, labels, &sample, n_classes, &tree_config, &mut rng)
            })
            .collect();

        RandomForest {
            trees,
            n_features,
            n_classes,
        }
    }

    /// Predict a single sample by majority vote over the trees.
    pub fn predict(&self, features: &[f64]) -> usize {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            let pred = tree.predict(features);
            if pred < self.n_classes {
                votes[pred] += 1;
            }
        }
        votes
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(class, _)| class)
            .unwrap_or(0)
    }

    /// Predict multiple samples, returning class ids.
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Vec<usize> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    /// Number of trees in the forest.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Expected number of features per sample.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of output classes.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated blobs; any sensible forest classifies them.
    fn blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.01;
            x.push(vec![0.0 + jitter, 0.0 + jitter]);
            y.push(0);
            x.push(vec![10.0 + jitter, 10.0 + jitter]);
            y.push(1);
        }
        (x, y)
    }

    #[test]
    fn separable_classes_are_learned() {
        let (x, y) = blobs();
        let config = ForestConfig {
            n_trees: 25,
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(&x, &y, 2, &config);
        assert_eq!(forest.predict(&[0.2, 0.1]), 0);
        assert_eq!(forest.predict(&[9.8, 10.1]), 1);
    }

    #[test]
    fn prediction_count_matches_input() {
        let (x, y) = blobs();
        let forest = RandomForest::fit(&x, &y, 2, &ForestConfig::default());
        let preds = forest.predict_batch(&x);
        assert_eq!(preds.len(), x.len());
    }

    #[test]
    fn training_is_deterministic_for_a_seed() {
        let (x, y) = blobs();
        let config = ForestConfig {
            n_trees: 10,
            ..ForestConfig::default()
        };
        let f1 = RandomForest::fit(&x, &y, 2, &config);
        let f2 = RandomForest::fit(&x, &y, 2, &config);
        assert_eq!(f1.predict_batch(&x), f2.predict_batch(&x));
    }

    #[test]
    fn forest_metadata() {
        let (x, y) = blobs();
        let config = ForestConfig {
            n_trees: 7,
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(&x, &y, 2, &config);
        assert_eq!(forest.n_trees(), 7);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.n_classes(), 2);
    }
}
