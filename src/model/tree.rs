//! CART regression tree (squared-error splits, bounded depth).

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

const MIN_SAMPLES_SPLIT: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub max_depth: usize,
    pub nodes: Vec<TreeNode>,
    /// Impurity decrease per feature, normalized to sum to one
    pub importances: Vec<f64>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn sse(y: &Array1<f64>, idx: &[usize]) -> f64 {
    if idx.is_empty() {
        return 0.0;
    }
    let n = idx.len() as f64;
    let sum: f64 = idx.iter().map(|&i| y[i]).sum();
    let sum_sq: f64 = idx.iter().map(|&i| y[i] * y[i]).sum();
    (sum_sq - sum * sum / n).max(0.0)
}

fn best_split(x: &Array2<f64>, y: &Array1<f64>, idx: &[usize], node_sse: f64) -> Option<Split> {
    let n = idx.len();
    let mut best: Option<Split> = None;
    let mut order = idx.to_vec();

    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));
        let total_sum: f64 = order.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = order.iter().map(|&i| y[i] * y[i]).sum();

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..n - 1 {
            let i = order[k];
            left_sum += y[i];
            left_sq += y[i] * y[i];

            let here = x[[i, feature]];
            let next = x[[order[k + 1], feature]];
            if next <= here {
                continue;
            }
            let nl = (k + 1) as f64;
            let nr = (n - k - 1) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let child_sse = (left_sq - left_sum * left_sum / nl).max(0.0)
                + (right_sq - right_sum * right_sum / nr).max(0.0);
            let gain = node_sse - child_sse;
            if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                best = Some(Split {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }
    best
}

impl RegressionTree {
    /// Fit on the rows listed in `sample`, which may repeat (bootstrap).
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, sample: &[usize], max_depth: usize) -> Self {
        let mut tree = Self {
            max_depth,
            nodes: Vec::new(),
            importances: vec![0.0; x.ncols()],
        };
        tree.grow(x, y, sample.to_vec(), 0);

        let total: f64 = tree.importances.iter().sum();
        if total > 0.0 {
            for v in tree.importances.iter_mut() {
                *v /= total;
            }
        }
        tree
    }

    fn grow(&mut self, x: &Array2<f64>, y: &Array1<f64>, idx: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        let value = idx.iter().map(|&i| y[i]).sum::<f64>() / idx.len().max(1) as f64;
        self.nodes.push(TreeNode::Leaf { value });

        let node_sse = sse(y, &idx);
        if depth >= self.max_depth || idx.len() < MIN_SAMPLES_SPLIT || node_sse <= 1e-12 {
            return id;
        }
        let Some(split) = best_split(x, y, &idx, node_sse) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .partition(|&&i| x[[i, split.feature]] <= split.threshold);
        self.importances[split.feature] += split.gain;

        let left = self.grow(x, y, left_idx, depth + 1);
        let right = self.grow(x, y, right_idx, depth + 1);
        self.nodes[id] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], id: usize) -> usize {
            match nodes.get(id) {
                Some(TreeNode::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}
