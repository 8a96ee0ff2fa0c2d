//! Bagged ensemble of regression trees with a fixed seed.

use super::tree::RegressionTree;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub trees: Vec<RegressionTree>,
}

impl ForestModel {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_estimators: usize,
        max_depth: usize,
        seed: u64,
    ) -> Self {
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..n_estimators.max(1))
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, max_depth)
            })
            .collect();
        Self { trees }
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Mean of per-tree importances, renormalized.
    pub fn importances(&self) -> Vec<f64> {
        let dim = self.trees.first().map(|t| t.importances.len()).unwrap_or(0);
        let mut out = vec![0.0; dim];
        for tree in &self.trees {
            for (acc, v) in out.iter_mut().zip(&tree.importances) {
                *acc += v;
            }
        }
        let total: f64 = out.iter().sum();
        if total > 0.0 {
            for v in out.iter_mut() {
                *v /= total;
            }
        }
        out
    }
}
