//! Isolation-forest anomaly detection over the anomaly feature set.
//!
//! Raw values are never clipped here; the fitted fences only report which
//! features sit outside them. Categories are read off robust-scaled values.

use super::{log_untrained, report_training, Confidence};
use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::features::{to_matrix, FeatureExtractor, FeatureSet, FeatureVector, OutlierFences};
use crate::model::{
    IsolationForestModel, ModelArtifact, ModelKind, ModelState, RobustScaler, TierPolicy,
    TrainingSummary,
};
use crate::recommend::anomaly_remediation;
use crate::records::StudentRecord;
use crate::risk::{AlertLevel, RiskEngine, Severity};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

const KIND: ModelKind = ModelKind::AnomalyDetector;
const HIGH_CONFIDENCE_MARGIN: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyCategory {
    LowEngagement,
    IrregularPattern,
    PoorPerformance,
    ExcessiveStruggle,
    InconsistentBehavior,
    Unknown,
}

impl AnomalyCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyCategory::LowEngagement => "low_engagement",
            AnomalyCategory::IrregularPattern => "irregular_pattern",
            AnomalyCategory::PoorPerformance => "poor_performance",
            AnomalyCategory::ExcessiveStruggle => "excessive_struggle",
            AnomalyCategory::InconsistentBehavior => "inconsistent_behavior",
            AnomalyCategory::Unknown => "unknown",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AnomalyCategory::LowEngagement => "learning engagement is very low",
            AnomalyCategory::IrregularPattern => "study pattern is irregular",
            AnomalyCategory::PoorPerformance => "academic results are abnormally low",
            AnomalyCategory::ExcessiveStruggle => "unusual difficulty with the material",
            AnomalyCategory::InconsistentBehavior => "effort and results do not line up",
            AnomalyCategory::Unknown => "unclassified deviation",
        }
    }

    /// Tags implied by a robust-scaled anomaly vector; `[Unknown]` when none fire.
    pub fn classify(scaled: &[f64]) -> Vec<Self> {
        let at = |name: &str| {
            FeatureSet::Anomaly
                .index_of(name)
                .and_then(|i| scaled.get(i).copied())
                .unwrap_or(0.0)
        };
        let academic = at("academic_performance");
        let mut tags = Vec::new();
        if at("engagement_score") < -1.0 {
            tags.push(AnomalyCategory::LowEngagement);
        }
        if at("homework_consistency") < -1.0 {
            tags.push(AnomalyCategory::IrregularPattern);
        }
        if academic < -1.5 {
            tags.push(AnomalyCategory::PoorPerformance);
        }
        if at("video_rumination_ratio") > 1.5 {
            tags.push(AnomalyCategory::ExcessiveStruggle);
        }
        let active = at("homework_completion_rate") > 0.5
            || at("discussion_posts") + at("discussion_replies") > 0.0;
        if academic < -1.0 && active {
            tags.push(AnomalyCategory::InconsistentBehavior);
        }
        if tags.is_empty() {
            tags.push(AnomalyCategory::Unknown);
        }
        tags
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEntry {
    pub user_id: String,
    pub score: f64,
    pub severity: Severity,
    pub categories: Vec<AnomalyCategory>,
    /// Raw features outside the flagging fences
    pub outlier_features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub total_users: usize,
    pub anomaly_count: usize,
    pub normal_count: usize,
    /// Percentage of scored students flagged
    pub anomaly_rate: f64,
    /// Most anomalous first
    pub anomalies: Vec<AnomalyEntry>,
    pub summary_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetection {
    pub user_id: String,
    pub is_anomaly: bool,
    pub score: f64,
    pub severity: Severity,
    pub confidence: Confidence,
    pub categories: Vec<AnomalyCategory>,
    pub alert_level: Option<AlertLevel>,
    pub outlier_features: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyParams {
    pub forest: IsolationForestModel,
    /// Report over the training cohort itself
    pub training_report: AnomalyReport,
}

/// Score of one raw vector under a fitted artifact.
struct Scored {
    score: f64,
    scaled: Vec<f64>,
    outliers: Vec<String>,
}

fn score_vector(
    scaler: &RobustScaler,
    fences: &OutlierFences,
    forest: &IsolationForestModel,
    values: &[f64],
) -> Scored {
    let scaled = scaler.transform_row(ArrayView1::from(values));
    let outliers = fences
        .flagged(values)
        .into_iter()
        .filter_map(|j| FeatureSet::Anomaly.names().get(j).map(|n| n.to_string()))
        .collect();
    Scored {
        score: forest.score(scaled.view()),
        scaled: scaled.to_vec(),
        outliers,
    }
}

fn summarize(anomalies: &[AnomalyEntry]) -> String {
    if anomalies.is_empty() {
        return "No anomalous behavior detected".to_string();
    }
    let count = |s: Severity| anomalies.iter().filter(|a| a.severity == s).count();
    let mut lines = Vec::new();
    let high = count(Severity::High);
    if high > 0 {
        lines.push(format!("{high} high-risk students found"));
    }
    let medium = count(Severity::Medium);
    if medium > 0 {
        lines.push(format!("{medium} medium-risk students found"));
    }

    let mut by_category: BTreeMap<AnomalyCategory, usize> = BTreeMap::new();
    for category in anomalies.iter().flat_map(|a| &a.categories) {
        *by_category.entry(*category).or_default() += 1;
    }
    // ties go to the first category in declaration order
    let dominant = by_category
        .iter()
        .fold(None::<(AnomalyCategory, usize)>, |best, (c, n)| match best {
            Some((_, m)) if m >= *n => best,
            _ => Some((*c, *n)),
        });
    if let Some((category, n)) = dominant {
        lines.push(format!(
            "most common anomaly: {} ({n} students)",
            category.description()
        ));
    }
    lines.join("; ")
}

fn build_report(
    engine: &RiskEngine,
    scaler: &RobustScaler,
    fences: &OutlierFences,
    forest: &IsolationForestModel,
    vectors: &[FeatureVector],
) -> AnomalyReport {
    let mut anomalies: Vec<AnomalyEntry> = vectors
        .iter()
        .filter_map(|v| {
            let scored = score_vector(scaler, fences, forest, v.as_slice());
            (scored.score < 0.0).then(|| AnomalyEntry {
                user_id: v.user_id.clone(),
                score: scored.score,
                severity: engine.severity(scored.score),
                categories: AnomalyCategory::classify(&scored.scaled),
                outlier_features: scored.outliers,
            })
        })
        .collect();
    anomalies.sort_by(|a, b| a.score.total_cmp(&b.score));

    let total = vectors.len();
    let anomaly_count = anomalies.len();
    let anomaly_rate = if total > 0 {
        anomaly_count as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    AnomalyReport {
        total_users: total,
        anomaly_count,
        normal_count: total - anomaly_count,
        anomaly_rate,
        summary_text: summarize(&anomalies),
        anomalies,
    }
}

pub struct AnomalyDetector {
    policy: TierPolicy,
    extractor: FeatureExtractor,
    engine: RiskEngine,
    state: ModelState<ModelArtifact<AnomalyParams>>,
}

impl AnomalyDetector {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            policy: TierPolicy::new(config.tiers.clone()),
            extractor: FeatureExtractor::new(config.features.clone()),
            engine: RiskEngine::new(config.risk.clone()),
            state: ModelState::Untrained,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_trained()
    }

    pub fn artifact(&self) -> Option<&ModelArtifact<AnomalyParams>> {
        self.state.artifact()
    }

    pub fn restore(&mut self, artifact: ModelArtifact<AnomalyParams>) -> Result<(), AnalyticsError> {
        artifact.check_layout(KIND)?;
        self.state.install(artifact);
        Ok(())
    }

    pub fn train(&mut self, records: &[StudentRecord]) -> bool {
        report_training(self.try_train(records)).is_some()
    }

    pub fn try_train(&mut self, records: &[StudentRecord]) -> Result<TrainingSummary, AnalyticsError> {
        let model = KIND.as_str();
        let (vectors, _) = self.extractor.extract(records, FeatureSet::Anomaly);
        let n = vectors.len();
        self.policy.ensure_sufficient(model, n)?;
        let plan = self.policy.select(n);
        info!(
            model,
            tier = ?plan.tier,
            samples = n,
            contamination = plan.contamination,
            estimators = plan.isolation_estimators,
            "tier selected"
        );

        let matrix = to_matrix(&vectors);
        let fences = OutlierFences::fit(&matrix, self.extractor.outlier_policy(FeatureSet::Anomaly));
        let scaler = RobustScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix);
        let forest = IsolationForestModel::fit(
            &scaled,
            plan.isolation_estimators,
            plan.contamination,
            plan.seed,
        )
        .map_err(|reason| AnalyticsError::training(model, reason))?;

        let training_report = build_report(&self.engine, &scaler, &fences, &forest, &vectors);
        info!(
            model,
            anomalies = training_report.anomaly_count,
            total = training_report.total_users,
            "training cohort scored"
        );
        let rate = training_report.anomaly_rate;
        let params = AnomalyParams {
            forest,
            training_report,
        };
        self.state
            .install(ModelArtifact::new(KIND, plan.tier, params, scaler, fences, n));
        Ok(TrainingSummary {
            model: KIND,
            tier: plan.tier,
            samples: n,
            skipped: records.len() - n,
            diagnostic: Some(rate),
        })
    }

    pub fn detect_anomalies(&self, record: &StudentRecord) -> Option<AnomalyDetection> {
        let Some(artifact) = self.state.artifact() else {
            log_untrained(KIND, "anomaly detection unavailable");
            return None;
        };
        let vector = match self.extractor.vectorize(record, FeatureSet::Anomaly) {
            Ok(v) => v,
            Err(e) => {
                warn!(user_id = %record.user_id, error = %e, "anomaly detection skipped");
                return None;
            }
        };
        let scored = score_vector(
            &artifact.scaler,
            &artifact.fences,
            &artifact.params.forest,
            vector.as_slice(),
        );
        let score = scored.score;
        let confidence = if score.abs() > HIGH_CONFIDENCE_MARGIN {
            Confidence::High
        } else {
            Confidence::Medium
        };

        if score >= 0.0 {
            return Some(AnomalyDetection {
                user_id: record.user_id.clone(),
                is_anomaly: false,
                score,
                severity: Severity::Normal,
                confidence,
                categories: Vec::new(),
                alert_level: None,
                outlier_features: scored.outliers,
                recommendations: Vec::new(),
            });
        }

        let categories = AnomalyCategory::classify(&scored.scaled);
        let alert_level = self.engine.alert_level(
            score,
            categories.contains(&AnomalyCategory::PoorPerformance),
            categories.contains(&AnomalyCategory::LowEngagement),
        );
        Some(AnomalyDetection {
            user_id: record.user_id.clone(),
            is_anomaly: true,
            score,
            severity: self.engine.severity(score),
            confidence,
            recommendations: anomaly_remediation(&categories),
            categories,
            alert_level: Some(alert_level),
            outlier_features: scored.outliers,
        })
    }

    pub fn batch_detect_anomalies(&self, records: &[StudentRecord]) -> Option<AnomalyReport> {
        let Some(artifact) = self.state.artifact() else {
            log_untrained(KIND, "batch anomaly detection unavailable");
            return None;
        };
        let (vectors, _) = self.extractor.extract(records, FeatureSet::Anomaly);
        Some(build_report(
            &self.engine,
            &artifact.scaler,
            &artifact.fences,
            &artifact.params.forest,
            &vectors,
        ))
    }
}
