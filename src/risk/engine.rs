//! Maps anomaly scores (negative = anomalous) and categories onto severity
//! tiers and alert levels using configurable thresholds.

use crate::config::RiskConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Not flagged as anomalous
    Normal,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Tier of a flagged score; never returns [`Severity::Normal`].
    pub fn from_score(score: f64, config: &RiskConfig) -> Self {
        if score < config.high_threshold {
            Severity::High
        } else if score < config.medium_threshold {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Attention,
    Warning,
    Urgent,
}

#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: RiskConfig,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn severity(&self, score: f64) -> Severity {
        Severity::from_score(score, &self.config)
    }

    /// Escalates on score alone, or on the category that warrants it.
    pub fn alert_level(&self, score: f64, poor_performance: bool, low_engagement: bool) -> AlertLevel {
        if score < self.config.high_threshold || poor_performance {
            AlertLevel::Urgent
        } else if score < self.config.medium_threshold || low_engagement {
            AlertLevel::Warning
        } else {
            AlertLevel::Attention
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}
