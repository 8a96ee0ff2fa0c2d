//! Feature extraction pipeline: records → indicators → vectors, plus IQR fences.

use super::stats::quartiles;
use super::{FeatureSet, FeatureVector, StudentIndicators};
use crate::config::FeaturesConfig;
use crate::error::AnalyticsError;
use crate::records::StudentRecord;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What to do with values outside the IQR fences of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "k")]
pub enum OutlierPolicy {
    /// Clamp into the fences (prediction, clustering)
    Clip(f64),
    /// Keep the value, report it (anomaly detection)
    Flag(f64),
}

impl OutlierPolicy {
    pub fn k(self) -> f64 {
        match self {
            OutlierPolicy::Clip(k) | OutlierPolicy::Flag(k) => k,
        }
    }
}

/// Per-column `[Q1 - k·IQR, Q3 + k·IQR]` bounds fitted on a training matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFences {
    pub policy: OutlierPolicy,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl OutlierFences {
    pub fn fit(matrix: &Array2<f64>, policy: OutlierPolicy) -> Self {
        let k = policy.k();
        let (lower, upper) = matrix
            .axis_iter(Axis(1))
            .map(|col| {
                let col = col.to_vec();
                let (q1, q3) = quartiles(&col);
                let iqr = q3 - q1;
                (q1 - k * iqr, q3 + k * iqr)
            })
            .unzip();
        Self {
            policy,
            lower,
            upper,
        }
    }

    /// Clip in place under [`OutlierPolicy::Clip`]; a no-op when flagging.
    pub fn apply(&self, matrix: &mut Array2<f64>) {
        if let OutlierPolicy::Flag(_) = self.policy {
            return;
        }
        for mut row in matrix.rows_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = v.max(self.lower[j]).min(self.upper[j]);
            }
        }
    }

    pub fn apply_row(&self, row: &mut [f64]) {
        if let OutlierPolicy::Flag(_) = self.policy {
            return;
        }
        for (j, v) in row.iter_mut().enumerate() {
            *v = v.max(self.lower[j]).min(self.upper[j]);
        }
    }

    /// Column indices of `row` lying outside the fences.
    pub fn flagged(&self, row: &[f64]) -> Vec<usize> {
        row.iter()
            .enumerate()
            .filter(|(j, v)| **v < self.lower[*j] || **v > self.upper[*j])
            .map(|(j, _)| j)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeaturesConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    pub fn outlier_policy(&self, set: FeatureSet) -> OutlierPolicy {
        match set {
            FeatureSet::Prediction | FeatureSet::Clustering => {
                OutlierPolicy::Clip(self.config.clip_iqr_k)
            }
            FeatureSet::Anomaly => OutlierPolicy::Flag(self.config.flag_iqr_k),
        }
    }

    /// Build one vector; fails when the record holds invalid raw values.
    pub fn vectorize(
        &self,
        record: &StudentRecord,
        set: FeatureSet,
    ) -> Result<FeatureVector, AnalyticsError> {
        let indicators = StudentIndicators::from_record(record)?;
        let values = set.vectorize(&indicators);
        if let Some((name, v)) = set
            .names()
            .iter()
            .zip(&values)
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(AnalyticsError::RecordExtraction {
                user_id: record.user_id.clone(),
                reason: format!("feature {name} resolved to {v}"),
            });
        }
        Ok(FeatureVector {
            user_id: record.user_id.clone(),
            set,
            values,
        })
    }

    /// Vectorize a batch. Records that fail derivation are logged and skipped;
    /// the returned ids are aligned with the vectors.
    pub fn extract(
        &self,
        records: &[StudentRecord],
        set: FeatureSet,
    ) -> (Vec<FeatureVector>, Vec<String>) {
        let mut vectors = Vec::with_capacity(records.len());
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            match self.vectorize(record, set) {
                Ok(v) => {
                    ids.push(v.user_id.clone());
                    vectors.push(v);
                }
                Err(e) => warn!(user_id = %record.user_id, feature_set = ?set, error = %e, "record skipped"),
            }
        }
        (vectors, ids)
    }
}
