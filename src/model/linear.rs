//! Ridge regression with an unpenalized intercept, solved in closed form.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeModel {
    pub alpha: f64,
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

/// Gaussian elimination with partial pivoting. `None` when `a` is singular.
pub fn solve_linear(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < PIVOT_EPSILON || !a[[pivot, col]].is_finite() {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    x.iter().all(|v: &f64| v.is_finite()).then_some(x)
}

impl RidgeModel {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Self, String> {
        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| "empty feature matrix".to_string())?;
        let y_mean = y.mean().ok_or_else(|| "empty target vector".to_string())?;

        let xc = x - &x_mean;
        let yc = y - y_mean;
        let mut gram = xc.t().dot(&xc);
        for i in 0..gram.nrows() {
            gram[[i, i]] += alpha;
        }
        let rhs = xc.t().dot(&yc);

        let coefficients = solve_linear(gram, rhs)
            .ok_or_else(|| "singular normal equations".to_string())?;
        let intercept = y_mean - x_mean.dot(&coefficients);
        Ok(Self {
            alpha,
            coefficients,
            intercept,
        })
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        row.dot(&self.coefficients) + self.intercept
    }

    /// Absolute coefficients normalized to sum to one.
    pub fn importances(&self) -> Vec<f64> {
        let abs: Vec<f64> = self.coefficients.iter().map(|c| c.abs()).collect();
        let total: f64 = abs.iter().sum();
        if total <= 0.0 {
            let d = abs.len().max(1) as f64;
            return vec![1.0 / d; abs.len()];
        }
        abs.into_iter().map(|a| a / total).collect()
    }
}
