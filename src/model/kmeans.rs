//! K-means with k-means++ seeding and several restarts.

use super::metrics::euclidean;
use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const DEFAULT_N_INIT: usize = 10;
pub const DEFAULT_MAX_ITER: usize = 300;
const RELATIVE_TOL: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    pub centroids: Array2<f64>,
    pub inertia: f64,
}

fn nearest(centroids: &Array2<f64>, row: ArrayView1<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let d = euclidean(row, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

fn plus_plus_init(x: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = x.nrows();
    let mut chosen = vec![rng.gen_range(0..n)];
    let mut d2: Vec<f64> = (0..n)
        .map(|i| euclidean(x.row(i), x.row(chosen[0])).powi(2))
        .collect();

    while chosen.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total <= 0.0 {
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = n - 1;
            for (i, w) in d2.iter().enumerate() {
                if target < *w {
                    pick = i;
                    break;
                }
                target -= w;
            }
            pick
        };
        chosen.push(next);
        for (i, d) in d2.iter_mut().enumerate() {
            *d = d.min(euclidean(x.row(i), x.row(next)).powi(2));
        }
    }
    x.select(Axis(0), &chosen)
}

fn lloyd(x: &Array2<f64>, mut centroids: Array2<f64>, max_iter: usize, tol: f64) -> (Array2<f64>, Vec<usize>, f64) {
    let n = x.nrows();
    let k = centroids.nrows();
    let mut labels = vec![0usize; n];

    for _ in 0..max_iter {
        let mut distances = vec![0.0; n];
        for i in 0..n {
            let (c, d) = nearest(&centroids, x.row(i));
            labels[i] = c;
            distances[i] = d;
        }

        let mut next = Array2::<f64>::zeros(centroids.raw_dim());
        let mut counts = vec![0usize; k];
        for i in 0..n {
            let mut row = next.row_mut(labels[i]);
            row += &x.row(i);
            counts[labels[i]] += 1;
        }
        for c in 0..k {
            if counts[c] > 0 {
                let mut row = next.row_mut(c);
                row /= counts[c] as f64;
            } else {
                // relocate an empty cluster onto the point worst served by its centroid
                let far = (0..n)
                    .max_by(|&a, &b| distances[a].total_cmp(&distances[b]))
                    .unwrap_or(0);
                next.row_mut(c).assign(&x.row(far));
                distances[far] = 0.0;
            }
        }

        let shift: f64 = (&next - &centroids).iter().map(|v| v * v).sum();
        centroids = next;
        if shift <= tol {
            break;
        }
    }

    let mut inertia = 0.0;
    for i in 0..n {
        let (c, d) = nearest(&centroids, x.row(i));
        labels[i] = c;
        inertia += d * d;
    }
    (centroids, labels, inertia)
}

impl KMeansModel {
    /// Best of `n_init` seeded restarts by inertia. Returns training labels too.
    pub fn fit(
        x: &Array2<f64>,
        k: usize,
        n_init: usize,
        max_iter: usize,
        seed: u64,
    ) -> Result<(Self, Vec<usize>), String> {
        let n = x.nrows();
        if k == 0 || k > n {
            return Err(format!("cannot form {k} clusters from {n} samples"));
        }
        let variance = x
            .var_axis(Axis(0), 0.0)
            .mean()
            .unwrap_or(0.0);
        let tol = RELATIVE_TOL * variance;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut best: Option<(Array2<f64>, Vec<usize>, f64)> = None;
        for _ in 0..n_init.max(1) {
            let init = plus_plus_init(x, k, &mut rng);
            let run = lloyd(x, init, max_iter, tol);
            if best.as_ref().map_or(true, |b| run.2 < b.2) {
                best = Some(run);
            }
        }
        let (centroids, labels, inertia) =
            best.ok_or_else(|| "no k-means run completed".to_string())?;
        if !inertia.is_finite() {
            return Err("non-finite inertia".to_string());
        }
        Ok((Self { centroids, inertia }, labels))
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> usize {
        nearest(&self.centroids, row).0
    }

    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }
}
