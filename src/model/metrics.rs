//! Diagnostics: regression error, k-fold cross-validation, silhouette.
//! None of these gate training success.

use super::regressor::Regressor;
use super::tier::RegressorParams;
use ndarray::{Array1, Array2, ArrayView1, Axis};

pub fn mean_squared_error(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    y.iter()
        .zip(pred)
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        / y.len() as f64
}

pub fn r2_score(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
    let Some(mean) = y.mean() else {
        return 0.0;
    };
    let ss_res: f64 = y.iter().zip(pred).map(|(a, b)| (a - b).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Contiguous k-fold R² scores; the first `n % k` folds take one extra row.
pub fn cross_val_r2(
    params: RegressorParams,
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: usize,
    seed: u64,
) -> Result<Vec<f64>, String> {
    let n = x.nrows();
    if folds < 2 || folds > n {
        return Err(format!("cannot split {n} samples into {folds} folds"));
    }
    let mut scores = Vec::with_capacity(folds);
    let mut start = 0;
    for f in 0..folds {
        let size = n / folds + usize::from(f < n % folds);
        let test: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..n).filter(|i| *i < start || *i >= start + size).collect();
        start += size;

        let model = Regressor::fit(
            params,
            &x.select(Axis(0), &train),
            &y.select(Axis(0), &train),
            seed,
        )?;
        let x_test = x.select(Axis(0), &test);
        let y_test = y.select(Axis(0), &test);
        scores.push(r2_score(&y_test, &model.predict(&x_test)));
    }
    Ok(scores)
}

pub fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| (p - q).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Mean silhouette coefficient. `None` unless 2 ≤ occupied clusters < n.
pub fn silhouette_score(x: &Array2<f64>, labels: &[usize]) -> Option<f64> {
    let n = x.nrows();
    let k = labels.iter().copied().max()? + 1;
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    let occupied = sizes.iter().filter(|s| **s > 0).count();
    if occupied < 2 || occupied >= n {
        return None;
    }

    let mut total = 0.0;
    for i in 0..n {
        let mut sums = vec![0.0; k];
        for j in 0..n {
            if i != j {
                sums[labels[j]] += euclidean(x.row(i), x.row(j));
            }
        }
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Some(total / n as f64)
}
