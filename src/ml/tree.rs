use rand::rngs::StdRng;
use rand::seq::SliceRandom;

// ---------------------------------------------------------------------------
// Decision tree – array-based CART classifier
// ---------------------------------------------------------------------------

/// A node in the decision tree.
#[derive(Debug, Clone)]
struct TreeNode {
    /// Feature index to split on (`-1` for leaf nodes).
    feature: i32,
    /// Split threshold (values <= threshold go left).
    threshold: f64,
    /// Index of left child (`-1` for leaf).
    left: i32,
    /// Index of right child (`-1` for leaf).
    right: i32,
    /// Majority class at this node (the prediction for leaves).
    prediction: usize,
}

impl TreeNode {
    const fn is_leaf(&self) -> bool {
        self.feature < 0
    }
}

/// Tree-growing parameters.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Maximum depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Do not split nodes with fewer samples than this.
    pub min_samples_split: usize,
    /// Number of features considered per split; `None` means all.
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

/// A CART decision tree trained with Gini impurity.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on the given sample indices of `(features, labels)`.
    ///
    /// `labels` are contiguous class ids in `0..n_classes`. The RNG drives
    /// per-split feature subsampling, so a seeded RNG makes training
    /// deterministic.
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[usize],
        indices: &[usize],
        n_classes: usize,
        config: &TreeConfig,
        rng: &mut StdRng,
    ) -> Self {
        assert_eq!(features.len(), labels.len());
        assert!(!indices.is_empty(), "cannot grow a tree on zero samples");

        let n_features = features.first().map_or(0, Vec::len);
        let mut tree = DecisionTree {
            nodes: Vec::new(),
            n_features,
        };
        let mut scratch = indices.to_vec();
        tree.grow(features, labels, &mut scratch, n_classes, config, rng, 0);
        tree
    }

    /// Recursively grow the subtree for `indices`, returning its node index.
    #[allow(clippy::too_many_arguments)]
    fn grow(
        &mut self,
        features: &[Vec<f64>],
        labels: &[usize],
        indices: &mut [usize],
        n_classes: usize,
        config: &TreeConfig,
        rng: &mut StdRng,
        depth: usize,
    ) -> i32 {
        let counts = class_counts(labels, indices, n_classes);
        let majority = argmax(&counts);

        let depth_exhausted = config.max_depth.is_some_and(|d| depth >= d);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_small = indices.len() < config.min_samples_split;

        let split = if pure || too_small || depth_exhausted {
            None
        } else {
            best_split(features, labels, indices, n_classes, config, rng)
        };

        let node_idx = self.nodes.len() as i32;
        self.nodes.push(TreeNode {
            feature: -1,
            threshold: 0.0,
            left: -1,
            right: -1,
            prediction: majority,
        });

        if let Some((feature, threshold)) = split {
            let mid = partition(features, indices, feature, threshold);
            // A split that separates nothing would recurse forever.
            if mid > 0 && mid < indices.len() {
                let (left_idx, right_idx) = indices.split_at_mut(mid);
                let left =
                    self.grow(features, labels, left_idx, n_classes, config, rng, depth + 1);
                let right =
                    self.grow(features, labels, right_idx, n_classes, config, rng, depth + 1);
                let node = &mut self.nodes[node_idx as usize];
                node.feature = feature as i32;
                node.threshold = threshold;
                node.left = left;
                node.right = right;
            }
        }
        node_idx
    }

    /// Classify a single sample by walking root to leaf.
    pub fn predict(&self, features: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                return node.prediction;
            }
            let value = features.get(node.feature as usize).copied().unwrap_or(0.0);
            idx = if value <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    /// Number of nodes in the tree.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Expected number of features per sample.
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

fn class_counts(labels: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in indices {
        counts[labels[i]] += 1;
    }
    counts
}

fn argmax(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .max_by_key(|(_, &c)| c)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / t;
            p * p
        })
        .sum::<f64>()
}

/// Find the `(feature, threshold)` minimising weighted Gini impurity over a
/// random feature subset. Thresholds are midpoints between consecutive
/// distinct values. Returns `None` when no candidate improves on the parent.
fn best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    indices: &[usize],
    n_classes: usize,
    config: &TreeConfig,
    rng: &mut StdRng,
) -> Option<(usize, f64)> {
    let n_features = features.first().map_or(0, Vec::len);
    let mut candidates: Vec<usize> = (0..n_features).collect();
    if let Some(k) = config.max_features {
        candidates.shuffle(rng);
        candidates.truncate(k.max(1));
    }

    let total = indices.len();
    let parent_counts = class_counts(labels, indices, n_classes);
    let parent_gini = gini(&parent_counts, total);

    let mut best: Option<(usize, f64)> = None;
    let mut best_impurity = parent_gini;

    for &feature in &candidates {
        // Sort this node's samples by the candidate feature once, then
        // sweep left-to-right maintaining incremental class counts.
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.clone();

        for i in 0..total - 1 {
            let sample = order[i];
            left_counts[labels[sample]] += 1;
            right_counts[labels[sample]] -= 1;

            let here = features[sample][feature];
            let next = features[order[i + 1]][feature];
            if here == next {
                continue;
            }

            let left_n = i + 1;
            let right_n = total - left_n;
            let weighted = (left_n as f64 * gini(&left_counts, left_n)
                + right_n as f64 * gini(&right_counts, right_n))
                / total as f64;

            if weighted < best_impurity - 1e-12 {
                best_impurity = weighted;
                best = Some((feature, (here + next) / 2.0));
            }
        }
    }
    best
}

/// Partition `indices` in place so samples with `feature <= threshold` come
/// first; returns the boundary position.
fn partition(features: &[Vec<f64>], indices: &mut [usize], feature: usize, threshold: f64) -> usize {
    let mut mid = 0;
    for i in 0..indices.len() {
        if features[indices[i]][feature] <= threshold {
            indices.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn xor_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for &(a, b) in &[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            // A few copies of each corner so splits have support.
            for _ in 0..5 {
                x.push(vec![a, b]);
                y.push(usize::from((a > 0.5) != (b > 0.5)));
            }
        }
        (x, y)
    }

    #[test]
    fn learns_xor_exactly() {
        let (x, y) = xor_data();
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, &y, &indices, 2, &TreeConfig::default(), &mut rng);

        for (row, &label) in x.iter().zip(&y) {
            assert_eq!(tree.predict(row), label);
        }
    }

    #[test]
    fn single_class_yields_single_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0, 0, 0];
        let indices = vec![0, 1, 2];
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, &y, &indices, 1, &TreeConfig::default(), &mut rng);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[5.0]), 0);
    }

    #[test]
    fn depth_limit_is_respected() {
        let (x, y) = xor_data();
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let config = TreeConfig {
            max_depth: Some(0),
            ..TreeConfig::default()
        };
        let tree = DecisionTree::fit(&x, &y, &indices, 2, &config, &mut rng);
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn deterministic_with_seeded_rng() {
        let (x, y) = xor_data();
        let indices: Vec<usize> = (0..x.len()).collect();
        let config = TreeConfig {
            max_features: Some(1),
            ..TreeConfig::default()
        };
        let mut rng1 = StdRng::seed_from_u64(9);
        let mut rng2 = StdRng::seed_from_u64(9);
        let t1 = DecisionTree::fit(&x, &y, &indices, 2, &config, &mut rng1);
        let t2 = DecisionTree::fit(&x, &y, &indices, 2, &config, &mut rng2);
        let probe = vec![0.3, 0.8];
        assert_eq!(t1.predict(&probe), t2.predict(&probe));
        assert_eq!(t1.n_nodes(), t2.n_nodes());
    }
}
