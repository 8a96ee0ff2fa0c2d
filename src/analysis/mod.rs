//! The three analysis components and the glue that runs them over a cohort.
//!
//! Each component follows the same contract: `train` reports success as a
//! `bool`, inference returns `None` until a training call has succeeded, and
//! `try_train` is available when the caller wants the failure reason.

mod anomaly;
mod clusterer;
mod cohort;
mod predictor;

pub use anomaly::{
    AnomalyCategory, AnomalyDetection, AnomalyDetector, AnomalyEntry, AnomalyParams, AnomalyReport,
};
pub use clusterer::{
    Archetype, BehaviorClusterer, ClusterAnalysis, ClusterAssignment, ClusterProfile,
    ClusterShare, ClustererParams,
};
pub use cohort::{CohortAnalyzer, CohortReport, TrainingOutcome};
pub use predictor::{GradePredictor, PredictionResult, PredictorParams};

use crate::error::AnalyticsError;
use crate::model::{ModelKind, TrainingSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Banded on the share of populated features.
    pub fn from_populated(fraction: f64) -> Self {
        if fraction > 0.8 {
            Confidence::High
        } else if fraction > 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// Log a training outcome and collapse it to the public `bool`.
fn report_training(result: Result<TrainingSummary, AnalyticsError>) -> Option<TrainingSummary> {
    match result {
        Ok(summary) => {
            info!(
                model = summary.model.as_str(),
                tier = ?summary.tier,
                samples = summary.samples,
                skipped = summary.skipped,
                diagnostic = ?summary.diagnostic,
                "model trained"
            );
            Some(summary)
        }
        Err(e @ AnalyticsError::InsufficientData { .. }) => {
            warn!(error = %e, "training skipped");
            None
        }
        Err(e) => {
            error!(error = %e, "training failed");
            None
        }
    }
}

fn log_untrained(kind: ModelKind, message: &str) {
    let e = AnalyticsError::UntrainedModel {
        model: kind.as_str(),
    };
    debug!(error = %e, "{message}");
}
