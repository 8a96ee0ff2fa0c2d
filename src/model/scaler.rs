//! Robust scaling: center on the median, divide by the inter-quartile range.

use crate::features::stats::{median, quartiles};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustScaler {
    pub center: Array1<f64>,
    pub scale: Array1<f64>,
}

impl RobustScaler {
    /// Columns with zero IQR keep unit scale.
    pub fn fit(x: &Array2<f64>) -> Self {
        let mut center = Array1::zeros(x.ncols());
        let mut scale = Array1::ones(x.ncols());
        for (j, col) in x.axis_iter(Axis(1)).enumerate() {
            let col = col.to_vec();
            center[j] = median(&col);
            let (q1, q3) = quartiles(&col);
            let iqr = q3 - q1;
            if iqr > f64::EPSILON {
                scale[j] = iqr;
            }
        }
        Self { center, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            row -= &self.center;
            row /= &self.scale;
        }
        out
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.center) / &self.scale
    }

    /// Map a scaled row back into raw feature space.
    pub fn inverse_transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        &row * &self.scale + &self.center
    }

    pub fn dim(&self) -> usize {
        self.center.len()
    }
}
