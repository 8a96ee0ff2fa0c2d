//! Sample-count driven complexity tiers shared by all three models.

use crate::config::TierConfig;
use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Small,
    Medium,
    Large,
}

impl Tier {
    fn index(self) -> usize {
        match self {
            Tier::Small => 0,
            Tier::Medium => 1,
            Tier::Large => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorParams {
    /// Ridge-regularized linear regression
    Ridge { alpha: f64 },
    /// Single CART regression tree
    Tree { max_depth: usize },
    /// Bootstrap-aggregated regression trees
    Forest { n_estimators: usize, max_depth: usize },
}

/// Everything a model needs to know about its tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPlan {
    pub tier: Tier,
    pub regressor: RegressorParams,
    pub clusters: usize,
    pub contamination: f64,
    pub isolation_estimators: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct TierPolicy {
    config: TierConfig,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::new(TierConfig::default())
    }
}

impl TierPolicy {
    pub fn new(config: TierConfig) -> Self {
        Self { config }
    }

    pub fn min_samples(&self) -> usize {
        self.config.min_samples
    }

    pub fn tier_for(&self, n: usize) -> Tier {
        if n < self.config.medium_min_samples {
            Tier::Small
        } else if n < self.config.large_min_samples {
            Tier::Medium
        } else {
            Tier::Large
        }
    }

    pub fn select(&self, n: usize) -> TierPlan {
        let tier = self.tier_for(n);
        let c = &self.config;
        let regressor = match tier {
            Tier::Small => RegressorParams::Ridge {
                alpha: c.ridge_alpha,
            },
            Tier::Medium => RegressorParams::Tree {
                max_depth: c.tree_max_depth,
            },
            Tier::Large => RegressorParams::Forest {
                n_estimators: c.forest_estimators,
                max_depth: c.forest_max_depth,
            },
        };
        TierPlan {
            tier,
            regressor,
            clusters: c.cluster_counts[tier.index()],
            contamination: c.contamination[tier.index()],
            isolation_estimators: c.isolation_estimators[tier.index()],
            seed: c.seed,
        }
    }

    /// Fail with [`AnalyticsError::InsufficientData`] below the absolute minimum.
    pub fn ensure_sufficient(&self, model: &'static str, n: usize) -> Result<(), AnalyticsError> {
        if n < self.config.min_samples {
            return Err(AnalyticsError::InsufficientData {
                model,
                available: n,
                required: self.config.min_samples,
            });
        }
        Ok(())
    }
}
