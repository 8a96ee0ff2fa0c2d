//! Analytics configuration. Loaded from JSON; every section has defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Data directory (artifact store, reports)
    pub data_dir: PathBuf,
    /// Cohort JSON file or directory of files
    pub records_path: PathBuf,
    /// Sample-count driven model tiers
    pub tiers: TierConfig,
    /// Feature extraction parameters
    pub features: FeaturesConfig,
    /// Anomaly severity thresholds
    pub risk: RiskConfig,
    /// Retrain scheduling
    pub schedule: ScheduleConfig,
    /// Logging
    pub log: LogConfig,
}

/// Tier table: sample-count boundaries and the hyperparameters of each tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Absolute minimum number of valid samples for any training call
    pub min_samples: usize,
    /// First sample count served by the tree tier
    pub medium_min_samples: usize,
    /// First sample count served by the ensemble tier
    pub large_min_samples: usize,
    pub ridge_alpha: f64,
    pub tree_max_depth: usize,
    pub forest_estimators: usize,
    pub forest_max_depth: usize,
    /// Cluster count per tier (small, medium, large)
    pub cluster_counts: [usize; 3],
    /// Assumed anomaly fraction per tier (small, medium, large)
    pub contamination: [f64; 3],
    /// Isolation trees per tier (small, medium, large)
    pub isolation_estimators: [usize; 3],
    /// Seed shared by every randomized fit
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// IQR multiplier for clipping on the prediction and clustering paths
    pub clip_iqr_k: f64,
    /// IQR multiplier for flagging on the anomaly path
    pub flag_iqr_k: f64,
    /// Cross-validation runs only from this many samples on
    pub cv_min_samples: usize,
    pub max_recommendations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Anomaly score below this is high severity
    pub high_threshold: f64,
    /// Anomaly score below this is medium severity
    pub medium_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// 0 runs a single training cycle
    pub retrain_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("cohort-insight"))
            .unwrap_or_else(|| PathBuf::from(".cohort-insight"));
        Self {
            records_path: data_dir.join("records"),
            data_dir,
            tiers: TierConfig::default(),
            features: FeaturesConfig::default(),
            risk: RiskConfig::default(),
            schedule: ScheduleConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            medium_min_samples: 15,
            large_min_samples: 50,
            ridge_alpha: 1.0,
            tree_max_depth: 5,
            forest_estimators: 50,
            forest_max_depth: 10,
            cluster_counts: [2, 3, 4],
            contamination: [0.3, 0.2, 0.1],
            isolation_estimators: [50, 100, 100],
            seed: 42,
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            clip_iqr_k: 1.5,
            flag_iqr_k: 2.0,
            cv_min_samples: 10,
            max_recommendations: 4,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_threshold: -0.5,
            medium_threshold: -0.2,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            retrain_interval_secs: 0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AnalyticsConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<AnalyticsConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
