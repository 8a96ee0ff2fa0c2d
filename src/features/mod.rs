//! Feature extraction: student records → derived indicators → model-specific vectors.

mod indicators;
mod pipeline;
pub mod stats;

pub use indicators::{
    StudentIndicators, NEUTRAL_BASELINE_SCORE, NEUTRAL_CONSISTENCY, RUMINATION_PENALTY_CAP,
};
pub use pipeline::{FeatureExtractor, OutlierFences, OutlierPolicy};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

const PREDICTION_FEATURES: [&str; 8] = [
    "homework_avg",
    "homework_completion_rate",
    "homework_consistency",
    "discussion_activity",
    "upvotes_ratio",
    "video_engagement",
    "learning_consistency",
    "base_performance",
];
const PREDICTION_NEUTRAL: [f64; 8] = [
    NEUTRAL_BASELINE_SCORE,
    0.0,
    NEUTRAL_CONSISTENCY,
    0.0,
    0.0,
    0.0,
    NEUTRAL_CONSISTENCY * 0.4,
    NEUTRAL_BASELINE_SCORE,
];

const CLUSTERING_FEATURES: [&str; 6] = [
    "learning_ability",
    "completion_rate",
    "engagement",
    "investment",
    "consistency",
    "academic_performance",
];
const CLUSTERING_NEUTRAL: [f64; 6] = [
    NEUTRAL_BASELINE_SCORE,
    0.0,
    0.0,
    0.0,
    NEUTRAL_CONSISTENCY,
    NEUTRAL_BASELINE_SCORE,
];

const ANOMALY_FEATURES: [&str; 11] = [
    "homework_avg",
    "homework_completion_rate",
    "homework_consistency",
    "discussion_posts",
    "discussion_replies",
    "upvotes_ratio",
    "video_watch_time",
    "video_rumination_ratio",
    "learning_pattern_score",
    "academic_performance",
    "engagement_score",
];
const ANOMALY_NEUTRAL: [f64; 11] = [
    0.0,
    0.0,
    NEUTRAL_CONSISTENCY,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    NEUTRAL_BASELINE_SCORE,
    0.0,
];

/// Which model a vector is built for. Order and length are fixed per set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    Prediction,
    Clustering,
    Anomaly,
}

impl FeatureSet {
    pub fn names(self) -> &'static [&'static str] {
        match self {
            FeatureSet::Prediction => &PREDICTION_FEATURES,
            FeatureSet::Clustering => &CLUSTERING_FEATURES,
            FeatureSet::Anomaly => &ANOMALY_FEATURES,
        }
    }

    /// Value each feature takes when its inputs are absent.
    pub fn neutral(self) -> &'static [f64] {
        match self {
            FeatureSet::Prediction => &PREDICTION_NEUTRAL,
            FeatureSet::Clustering => &CLUSTERING_NEUTRAL,
            FeatureSet::Anomaly => &ANOMALY_NEUTRAL,
        }
    }

    pub fn dim(self) -> usize {
        self.names().len()
    }

    pub fn index_of(self, name: &str) -> Option<usize> {
        self.names().iter().position(|n| *n == name)
    }

    pub fn vectorize(self, s: &StudentIndicators) -> Vec<f64> {
        match self {
            FeatureSet::Prediction => {
                let homework_avg = s.homework_avg.unwrap_or(NEUTRAL_BASELINE_SCORE);
                vec![
                    homework_avg,
                    s.completion_rate,
                    s.consistency_score,
                    s.discussion_activity(),
                    s.upvotes_ratio(),
                    s.video_investment,
                    s.learning_consistency(),
                    s.course_points.unwrap_or(homework_avg),
                ]
            }
            FeatureSet::Clustering => vec![
                s.homework_avg.unwrap_or(NEUTRAL_BASELINE_SCORE),
                s.completion_rate,
                s.engagement_level,
                s.video_investment,
                s.consistency_score,
                s.academic_performance,
            ],
            FeatureSet::Anomaly => vec![
                s.homework_avg.unwrap_or(0.0),
                s.completion_rate,
                s.consistency_score,
                s.posted,
                s.replied,
                s.upvotes_ratio(),
                s.video_watch_time,
                s.rumination_ratio,
                s.learning_pattern_score(),
                s.academic_performance,
                s.engagement_score(),
            ],
        }
    }
}

/// Fixed-order feature vector for one student and one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub user_id: String,
    pub set: FeatureSet,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.set.names()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.set.index_of(name).and_then(|i| self.values.get(i).copied())
    }

    /// Share of features that differ from zero and from their neutral default.
    pub fn populated_fraction(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let populated = self
            .values
            .iter()
            .zip(self.set.neutral())
            .filter(|(v, n)| **v != 0.0 && (**v - **n).abs() > 1e-9)
            .count();
        populated as f64 / self.values.len() as f64
    }
}

/// Stack vectors row-wise into an `n × dim` matrix.
pub fn to_matrix(vectors: &[FeatureVector]) -> Array2<f64> {
    let dim = vectors.first().map(|v| v.values.len()).unwrap_or(0);
    let mut m = Array2::zeros((vectors.len(), dim));
    for (mut row, v) in m.rows_mut().into_iter().zip(vectors) {
        for (dst, src) in row.iter_mut().zip(&v.values) {
            *dst = *src;
        }
    }
    m
}
