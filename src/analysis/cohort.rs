//! Runs all three components over one cohort and bundles their output.

use super::{
    report_training, AnomalyDetector, AnomalyReport, BehaviorClusterer, ClusterAnalysis,
    GradePredictor, PredictionResult,
};
use crate::config::AnalyticsConfig;
use crate::error::StoreError;
use crate::model::{ModelKind, TrainingSummary};
use crate::records::StudentRecord;
use crate::storage::ArtifactStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Per-model result of a training round; `None` where training failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub grade_predictor: Option<TrainingSummary>,
    pub behavior_clusterer: Option<TrainingSummary>,
    pub anomaly_detector: Option<TrainingSummary>,
}

impl TrainingOutcome {
    pub fn trained_count(&self) -> usize {
        [
            &self.grade_predictor,
            &self.behavior_clusterer,
            &self.anomaly_detector,
        ]
        .iter()
        .filter(|s| s.is_some())
        .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortReport {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub predictions: Vec<PredictionResult>,
    pub clusters: Option<ClusterAnalysis>,
    pub anomalies: Option<AnomalyReport>,
}

pub struct CohortAnalyzer {
    predictor: GradePredictor,
    clusterer: BehaviorClusterer,
    detector: AnomalyDetector,
}

impl CohortAnalyzer {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            predictor: GradePredictor::new(config),
            clusterer: BehaviorClusterer::new(config),
            detector: AnomalyDetector::new(config),
        }
    }

    pub fn predictor(&self) -> &GradePredictor {
        &self.predictor
    }

    pub fn clusterer(&self) -> &BehaviorClusterer {
        &self.clusterer
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Train every component independently. A failure leaves that
    /// component's previous artifact in place.
    pub fn train_all(&mut self, records: &[StudentRecord]) -> TrainingOutcome {
        let outcome = TrainingOutcome {
            grade_predictor: report_training(self.predictor.try_train(records)),
            behavior_clusterer: report_training(self.clusterer.try_train(records)),
            anomaly_detector: report_training(self.detector.try_train(records)),
        };
        info!(
            records = records.len(),
            trained = outcome.trained_count(),
            "training round complete"
        );
        outcome
    }

    pub fn analyze(&self, records: &[StudentRecord]) -> CohortReport {
        CohortReport {
            generated_at: Utc::now(),
            total_records: records.len(),
            predictions: records.iter().filter_map(|r| self.predictor.predict(r)).collect(),
            clusters: self.clusterer.get_all_clusters_analysis(records),
            anomalies: self.detector.batch_detect_anomalies(records),
        }
    }

    /// Persist every trained artifact; returns how many were written.
    pub fn save(&self, store: &ArtifactStore) -> Result<usize, StoreError> {
        let mut saved = 0;
        if let Some(a) = self.predictor.artifact() {
            store.save(a)?;
            saved += 1;
        }
        if let Some(a) = self.clusterer.artifact() {
            store.save(a)?;
            saved += 1;
        }
        if let Some(a) = self.detector.artifact() {
            store.save(a)?;
            saved += 1;
        }
        Ok(saved)
    }

    /// Install the newest stored artifact of each kind; returns how many were installed.
    pub fn restore(&mut self, store: &ArtifactStore) -> Result<usize, StoreError> {
        let mut restored = 0;
        if let Some(a) = store.load_latest(ModelKind::GradePredictor)? {
            match self.predictor.restore(a) {
                Ok(()) => restored += 1,
                Err(e) => warn!(error = %e, "stored artifact rejected"),
            }
        }
        if let Some(a) = store.load_latest(ModelKind::BehaviorClusterer)? {
            match self.clusterer.restore(a) {
                Ok(()) => restored += 1,
                Err(e) => warn!(error = %e, "stored artifact rejected"),
            }
        }
        if let Some(a) = store.load_latest(ModelKind::AnomalyDetector)? {
            match self.detector.restore(a) {
                Ok(()) => restored += 1,
                Err(e) => warn!(error = %e, "stored artifact rejected"),
            }
        }
        Ok(restored)
    }
}
