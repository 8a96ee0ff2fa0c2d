//! Grade prediction: prediction feature vector → score in [0, 100].

use super::{log_untrained, report_training, Confidence};
use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::features::{to_matrix, FeatureExtractor, FeatureSet, OutlierFences};
use crate::model::metrics::{cross_val_r2, mean_squared_error, r2_score};
use crate::model::{
    ModelArtifact, ModelKind, ModelState, Regressor, RobustScaler, TierPolicy, TrainingSummary,
};
use crate::recommend::prediction_recommendations;
use crate::records::StudentRecord;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

const KIND: ModelKind = ModelKind::GradePredictor;
const MAX_FOLDS: usize = 5;

/// Fitted regressor plus the diagnostics gathered while fitting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorParams {
    pub regressor: Regressor,
    pub train_r2: f64,
    pub train_mse: f64,
    /// Mean cross-validated R², when the cohort was large enough
    pub cv_r2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub user_id: String,
    pub predicted_score: f64,
    pub confidence: Confidence,
    pub feature_importance: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
}

pub struct GradePredictor {
    policy: TierPolicy,
    extractor: FeatureExtractor,
    state: ModelState<ModelArtifact<PredictorParams>>,
}

impl GradePredictor {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            policy: TierPolicy::new(config.tiers.clone()),
            extractor: FeatureExtractor::new(config.features.clone()),
            state: ModelState::Untrained,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_trained()
    }

    pub fn artifact(&self) -> Option<&ModelArtifact<PredictorParams>> {
        self.state.artifact()
    }

    /// Install a previously saved artifact in place of the current state.
    pub fn restore(&mut self, artifact: ModelArtifact<PredictorParams>) -> Result<(), AnalyticsError> {
        artifact.check_layout(KIND)?;
        self.state.install(artifact);
        Ok(())
    }

    pub fn train(&mut self, records: &[StudentRecord]) -> bool {
        report_training(self.try_train(records)).is_some()
    }

    /// Records without a positive comprehensive score are left out of training.
    pub fn try_train(&mut self, records: &[StudentRecord]) -> Result<TrainingSummary, AnalyticsError> {
        let model = KIND.as_str();
        let mut vectors = Vec::with_capacity(records.len());
        let mut targets = Vec::with_capacity(records.len());
        let mut skipped = 0;
        for record in records {
            let Some(target) = record.target_score() else {
                skipped += 1;
                continue;
            };
            match self.extractor.vectorize(record, FeatureSet::Prediction) {
                Ok(v) => {
                    vectors.push(v);
                    targets.push(target);
                }
                Err(e) => {
                    warn!(user_id = %record.user_id, error = %e, "record skipped");
                    skipped += 1;
                }
            }
        }

        let n = vectors.len();
        self.policy.ensure_sufficient(model, n)?;
        let plan = self.policy.select(n);
        info!(model, tier = ?plan.tier, samples = n, regressor = ?plan.regressor, "tier selected");

        let mut matrix = to_matrix(&vectors);
        let fences = OutlierFences::fit(&matrix, self.extractor.outlier_policy(FeatureSet::Prediction));
        fences.apply(&mut matrix);
        let scaler = RobustScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix);
        let y = Array1::from(targets);

        let regressor = Regressor::fit(plan.regressor, &scaled, &y, plan.seed)
            .map_err(|reason| AnalyticsError::training(model, reason))?;
        let fitted = regressor.predict(&scaled);
        if fitted.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::training(model, "non-finite fitted values"));
        }
        let train_r2 = r2_score(&y, &fitted);
        let train_mse = mean_squared_error(&y, &fitted);

        let cv_r2 = if n >= self.extractor.config().cv_min_samples {
            let folds = (n / 2).min(MAX_FOLDS);
            match cross_val_r2(plan.regressor, &scaled, &y, folds, plan.seed) {
                Ok(scores) => {
                    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
                    info!(model, folds, cv_r2 = mean, "cross-validation");
                    Some(mean)
                }
                Err(e) => {
                    warn!(model, error = %e, "cross-validation skipped");
                    None
                }
            }
        } else {
            None
        };
        info!(model, regressor = regressor.name(), train_r2, train_mse, "regressor fitted");

        let params = PredictorParams {
            regressor,
            train_r2,
            train_mse,
            cv_r2,
        };
        self.state
            .install(ModelArtifact::new(KIND, plan.tier, params, scaler, fences, n));
        Ok(TrainingSummary {
            model: KIND,
            tier: plan.tier,
            samples: n,
            skipped,
            diagnostic: cv_r2,
        })
    }

    pub fn predict(&self, record: &StudentRecord) -> Option<PredictionResult> {
        let Some(artifact) = self.state.artifact() else {
            log_untrained(KIND, "prediction unavailable");
            return None;
        };
        let vector = match self.extractor.vectorize(record, FeatureSet::Prediction) {
            Ok(v) => v,
            Err(e) => {
                warn!(user_id = %record.user_id, error = %e, "prediction skipped");
                return None;
            }
        };

        let mut row = vector.values.clone();
        artifact.fences.apply_row(&mut row);
        let scaled = artifact.scaler.transform_row(ArrayView1::from(&row[..]));
        let raw = artifact.params.regressor.predict_row(scaled.view());
        if !raw.is_finite() {
            warn!(user_id = %record.user_id, "non-finite prediction");
            return None;
        }

        let feature_importance = artifact
            .feature_names
            .iter()
            .cloned()
            .zip(artifact.params.regressor.importances())
            .collect();
        Some(PredictionResult {
            user_id: record.user_id.clone(),
            predicted_score: raw.max(0.0).min(100.0),
            confidence: Confidence::from_populated(vector.populated_fraction()),
            feature_importance,
            recommendations: prediction_recommendations(
                &vector,
                self.extractor.config().max_recommendations,
            ),
        })
    }
}
