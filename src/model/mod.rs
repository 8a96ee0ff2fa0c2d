//! Model primitives and the shared trained-state machinery.
//!
//! Each analysis component owns one [`ModelState`]. Training builds a complete
//! [`ModelArtifact`] off to the side and swaps it in only on success.

mod forest;
mod isolation;
mod kmeans;
mod linear;
pub mod metrics;
mod regressor;
mod scaler;
mod tier;
mod tree;

pub use forest::ForestModel;
pub use isolation::{average_path_length, IsolationForestModel, IsolationNode, IsolationTree};
pub use kmeans::{KMeansModel, DEFAULT_MAX_ITER, DEFAULT_N_INIT};
pub use linear::{solve_linear, RidgeModel};
pub use regressor::Regressor;
pub use scaler::RobustScaler;
pub use tier::{RegressorParams, Tier, TierPlan, TierPolicy};
pub use tree::{RegressionTree, TreeNode};

use crate::error::AnalyticsError;
use crate::features::{FeatureSet, OutlierFences};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    GradePredictor,
    BehaviorClusterer,
    AnomalyDetector,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::GradePredictor => "grade_predictor",
            ModelKind::BehaviorClusterer => "behavior_clusterer",
            ModelKind::AnomalyDetector => "anomaly_detector",
        }
    }

    pub fn feature_set(self) -> FeatureSet {
        match self {
            ModelKind::GradePredictor => FeatureSet::Prediction,
            ModelKind::BehaviorClusterer => FeatureSet::Clustering,
            ModelKind::AnomalyDetector => FeatureSet::Anomaly,
        }
    }
}

/// Complete fitted state of one model: parameters, scaler, fences and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact<P> {
    pub id: Uuid,
    pub kind: ModelKind,
    pub tier: Tier,
    pub params: P,
    pub scaler: RobustScaler,
    pub fences: OutlierFences,
    pub sample_count: usize,
    pub feature_names: Vec<String>,
    pub trained_at: DateTime<Utc>,
}

impl<P> ModelArtifact<P> {
    pub fn new(
        kind: ModelKind,
        tier: Tier,
        params: P,
        scaler: RobustScaler,
        fences: OutlierFences,
        sample_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            tier,
            params,
            scaler,
            fences,
            sample_count,
            feature_names: kind
                .feature_set()
                .names()
                .iter()
                .map(|n| n.to_string())
                .collect(),
            trained_at: Utc::now(),
        }
    }

    /// Reject artifacts whose kind or feature layout differs from what
    /// `kind` vectorizes today.
    pub fn check_layout(&self, kind: ModelKind) -> Result<(), AnalyticsError> {
        let model = kind.as_str();
        if self.kind != kind {
            return Err(AnalyticsError::IncompatibleArtifact {
                model,
                reason: format!("artifact is a {}", self.kind.as_str()),
            });
        }
        let expected = kind.feature_set().names();
        let same = self.feature_names.len() == expected.len()
            && self.feature_names.iter().zip(expected).all(|(a, b)| a == b);
        if !same || self.scaler.dim() != expected.len() {
            return Err(AnalyticsError::IncompatibleArtifact {
                model,
                reason: format!("feature layout {:?} != {:?}", self.feature_names, expected),
            });
        }
        Ok(())
    }
}

/// Two-state lifecycle of a model component.
#[derive(Debug, Clone)]
pub enum ModelState<A> {
    Untrained,
    Trained(A),
}

impl<A> Default for ModelState<A> {
    fn default() -> Self {
        ModelState::Untrained
    }
}

impl<A> ModelState<A> {
    pub fn artifact(&self) -> Option<&A> {
        match self {
            ModelState::Trained(a) => Some(a),
            ModelState::Untrained => None,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, ModelState::Trained(_))
    }

    /// Swap in a freshly trained artifact wholesale.
    pub fn install(&mut self, artifact: A) {
        *self = ModelState::Trained(artifact);
    }
}

/// What a successful training call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub model: ModelKind,
    pub tier: Tier,
    pub samples: usize,
    pub skipped: usize,
    /// Cross-validated R², silhouette or anomaly rate, depending on the model
    pub diagnostic: Option<f64>,
}
