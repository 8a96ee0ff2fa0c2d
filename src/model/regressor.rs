//! Tier-selected regressor behind one interface.

use super::forest::ForestModel;
use super::linear::RidgeModel;
use super::tier::RegressorParams;
use super::tree::RegressionTree;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Ridge(RidgeModel),
    Tree(RegressionTree),
    Forest(ForestModel),
}

impl Regressor {
    pub fn fit(
        params: RegressorParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
        seed: u64,
    ) -> Result<Self, String> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(format!(
                "feature rows ({}) and targets ({}) disagree",
                x.nrows(),
                y.len()
            ));
        }
        let model = match params {
            RegressorParams::Ridge { alpha } => Regressor::Ridge(RidgeModel::fit(x, y, alpha)?),
            RegressorParams::Tree { max_depth } => {
                let all: Vec<usize> = (0..x.nrows()).collect();
                Regressor::Tree(RegressionTree::fit(x, y, &all, max_depth))
            }
            RegressorParams::Forest {
                n_estimators,
                max_depth,
            } => Regressor::Forest(ForestModel::fit(x, y, n_estimators, max_depth, seed)),
        };
        Ok(model)
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        match self {
            Regressor::Ridge(m) => m.predict_row(row),
            Regressor::Tree(m) => m.predict_row(row),
            Regressor::Forest(m) => m.predict_row(row),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }

    /// Native importances for trees, normalized |coefficients| for ridge.
    pub fn importances(&self) -> Vec<f64> {
        match self {
            Regressor::Ridge(m) => m.importances(),
            Regressor::Tree(m) => m.importances.clone(),
            Regressor::Forest(m) => m.importances(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Regressor::Ridge(_) => "ridge",
            Regressor::Tree(_) => "decision_tree",
            Regressor::Forest(_) => "bagged_forest",
        }
    }
}
