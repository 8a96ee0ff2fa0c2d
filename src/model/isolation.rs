//! Isolation forest. Scores are negative for anomalies and expressed in
//! units of the spread of training scores, so severity cut-offs do not
//! depend on cohort size.

use crate::features::stats::{quantile, quartiles};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const MAX_SAMPLES: usize = 256;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
const MIN_SPREAD: f64 = 1e-3;

/// Average path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum IsolationNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<IsolationNode>,
}

impl IsolationTree {
    fn build(x: &Array2<f64>, sample: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, sample, 0, height_limit, rng);
        tree
    }

    fn grow(
        &mut self,
        x: &Array2<f64>,
        idx: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(IsolationNode::Leaf { size: idx.len() });
        if depth >= height_limit || idx.len() <= 1 {
            return id;
        }

        // only features that still vary inside this node can isolate anything
        let candidates: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|f| {
                let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(x[[i, f]]), hi.max(x[[i, f]]))
                });
                (hi > lo).then_some((f, lo, hi))
            })
            .collect();
        if candidates.is_empty() {
            return id;
        }
        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            idx.iter().partition(|&&i| x[[i, feature]] <= threshold);
        let left = self.grow(x, left_idx, depth + 1, height_limit, rng);
        let right = self.grow(x, right_idx, depth + 1, height_limit, rng);
        self.nodes[id] = IsolationNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    pub fn path_length(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes.get(id) {
                Some(IsolationNode::Leaf { size }) => return depth + average_path_length(*size),
                Some(IsolationNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
                None => return depth,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestModel {
    pub trees: Vec<IsolationTree>,
    pub sample_size: usize,
    pub contamination: f64,
    /// Raw score at the contamination percentile of the training set
    pub offset: f64,
    /// Inter-quartile range of training raw scores
    pub spread: f64,
}

impl IsolationForestModel {
    pub fn fit(
        x: &Array2<f64>,
        n_estimators: usize,
        contamination: f64,
        seed: u64,
    ) -> Result<Self, String> {
        let n = x.nrows();
        if n < 2 {
            return Err(format!("isolation forest needs at least 2 samples, got {n}"));
        }
        if !(0.0..=0.5).contains(&contamination) {
            return Err(format!("contamination {contamination} outside [0, 0.5]"));
        }

        let sample_size = n.min(MAX_SAMPLES);
        let height_limit = (sample_size as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..n_estimators.max(1))
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::build(x, sample, height_limit, &mut rng)
            })
            .collect();

        let mut model = Self {
            trees,
            sample_size,
            contamination,
            offset: 0.0,
            spread: 1.0,
        };
        let raw: Vec<f64> = x.rows().into_iter().map(|r| model.raw_score(r)).collect();
        if raw.iter().any(|s| !s.is_finite()) {
            return Err("non-finite isolation score".to_string());
        }
        model.offset = quantile(&raw, contamination);
        let (q1, q3) = quartiles(&raw);
        model.spread = (q3 - q1).max(MIN_SPREAD);
        Ok(model)
    }

    /// `-2^(-E[h]/c(ψ))`, in (-1, 0); lower is more isolated.
    pub fn raw_score(&self, row: ArrayView1<f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let mean_path =
            self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size).max(f64::EPSILON);
        -(2f64).powf(-mean_path / norm)
    }

    /// Distance from the contamination offset in units of training spread.
    pub fn score(&self, row: ArrayView1<f64>) -> f64 {
        (self.raw_score(row) - self.offset) / self.spread
    }

    pub fn is_anomaly(&self, row: ArrayView1<f64>) -> bool {
        self.score(row) < 0.0
    }
}
