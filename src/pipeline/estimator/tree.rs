//! CART regression tree
//!
//! Splits minimize the summed squared error of the two children. Candidate
//! thresholds sit halfway between adjacent distinct feature values, and ties
//! between equally good splits resolve to the lowest feature index, then the
//! lowest threshold, so fitting is fully deterministic for a given sample.

use serde::{Deserialize, Serialize};

use super::super::encoder::FeatureMatrix;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Maximum depth (None = grow until leaves are pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split an internal node
    pub min_samples_split: usize,
    /// Minimum samples required in each leaf
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Fitted regression tree stored as a flat node arena (root at index 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    /// Fit on the rows of `x` listed in `samples` (repeats allowed, for bootstrap)
    pub fn fit(x: &FeatureMatrix, y: &[f64], samples: &[usize], params: &TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let mut samples = samples.to_vec();
        if samples.is_empty() {
            tree.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            tree.grow(x, y, &mut samples, 0, params);
        }
        tree
    }

    /// Predict a single encoded row
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    fn grow(
        &mut self,
        x: &FeatureMatrix,
        y: &[f64],
        samples: &mut [usize],
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let idx = self.nodes.len();
        let mean = samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len() as f64;
        self.nodes.push(Node::Leaf { value: mean });

        let depth_reached = params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || samples.len() < params.min_samples_split.max(2) {
            return idx;
        }

        let Some(split) = find_best_split(x, y, samples, params.min_samples_leaf.max(1)) else {
            return idx;
        };

        // Partition in place: rows going left first
        samples.sort_by(|&a, &b| {
            let ga = x.get(a, split.feature) > split.threshold;
            let gb = x.get(b, split.feature) > split.threshold;
            ga.cmp(&gb).then(a.cmp(&b))
        });
        let n_left = samples
            .iter()
            .take_while(|&&i| x.get(i, split.feature) <= split.threshold)
            .count();
        let (left_samples, right_samples) = samples.split_at_mut(n_left);

        let left = self.grow(x, y, left_samples, depth + 1, params);
        let right = self.grow(x, y, right_samples, depth + 1, params);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }
}

/// Search all features for the split with the lowest children SSE.
///
/// Maximizing `S_l²/n_l + S_r²/n_r` is equivalent to minimizing the summed
/// squared error of the children, and avoids a second pass over the data.
fn find_best_split(
    x: &FeatureMatrix,
    y: &[f64],
    samples: &[usize],
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = samples.len();
    if n < 2 * min_leaf {
        return None;
    }

    let total: f64 = samples.iter().map(|&i| y[i]).sum();
    let parent_score = total * total / n as f64;
    let mut best: Option<BestSplit> = None;
    let mut order: Vec<usize> = samples.to_vec();

    for feature in 0..x.n_cols() {
        order.sort_by(|&a, &b| {
            x.get(a, feature)
                .partial_cmp(&x.get(b, feature))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += y[order[k]];
            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let here = x.get(order[k], feature);
            let next = x.get(order[k + 1], feature);
            if next - here <= 1e-12 * here.abs().max(1.0) {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            // Require a real improvement over the parent to avoid splitting on noise
            if score <= parent_score + 1e-12 * parent_score.abs() {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(BestSplit {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    score,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (FeatureMatrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 9.0 }).collect();
        (FeatureMatrix::from_rows(&rows).unwrap(), y)
    }

    #[test]
    fn test_tree_learns_step_function() {
        let (x, y) = step_data();
        let samples: Vec<usize> = (0..10).collect();
        let tree = RegressionTree::fit(&x, &y, &samples, &TreeParams::default());

        assert_eq!(tree.predict_row(&[2.0, 0.0]), 1.0);
        assert_eq!(tree.predict_row(&[7.0, 0.0]), 9.0);
        // Split threshold is the midpoint 4.5
        assert_eq!(tree.predict_row(&[4.4, 0.0]), 1.0);
        assert_eq!(tree.predict_row(&[4.6, 0.0]), 9.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_tree_respects_max_depth() {
        let rows: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..32).map(|i| (i * i) as f64).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let samples: Vec<usize> = (0..32).collect();
        let params = TreeParams {
            max_depth: Some(2),
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(&x, &y, &samples, &params);
        assert!(tree.depth() <= 2);
        assert!(tree.node_count() <= 7);
    }

    #[test]
    fn test_constant_target_gives_single_leaf() {
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let y = vec![3.0; 6];
        let tree = RegressionTree::fit(&x, &y, &(0..6).collect::<Vec<_>>(), &TreeParams::default());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_row(&[100.0]), 3.0);
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_leaves() {
        let (x, y) = step_data();
        let samples: Vec<usize> = (0..10).collect();
        let params = TreeParams {
            min_samples_leaf: 6,
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(&x, &y, &samples, &params);
        assert_eq!(tree.node_count(), 1);
        assert!((tree.predict_row(&[0.0, 0.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_bootstrap_duplicates_are_weighted() {
        let (x, y) = step_data();
        // Sample row 9 many times: the right leaf mean stays 9
        let samples = vec![0, 1, 2, 9, 9, 9, 9];
        let tree = RegressionTree::fit(&x, &y, &samples, &TreeParams::default());
        assert_eq!(tree.predict_row(&[9.0, 0.0]), 9.0);
        assert_eq!(tree.predict_row(&[0.0, 0.0]), 1.0);
    }
}
