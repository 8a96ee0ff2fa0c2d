//! Behavioral clustering into a tier-chosen number of archetypes.
//!
//! Archetype names are bound to cluster indices, not to what a cluster
//! actually contains. The characteristics list is computed from the
//! cluster's real centroid, so the two can disagree.

use super::{log_untrained, report_training};
use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::features::{to_matrix, FeatureExtractor, FeatureSet, OutlierFences};
use crate::model::metrics::silhouette_score;
use crate::model::{
    KMeansModel, ModelArtifact, ModelKind, ModelState, RobustScaler, TierPolicy, TrainingSummary,
    DEFAULT_MAX_ITER, DEFAULT_N_INIT,
};
use crate::recommend::cluster_recommendations;
use crate::records::StudentRecord;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

const KIND: ModelKind = ModelKind::BehaviorClusterer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    HighEfficiency,
    Steady,
    NeedsSupport,
    Passive,
}

impl Archetype {
    pub fn for_cluster(cluster_id: usize) -> Option<Self> {
        match cluster_id {
            0 => Some(Archetype::HighEfficiency),
            1 => Some(Archetype::Steady),
            2 => Some(Archetype::NeedsSupport),
            3 => Some(Archetype::Passive),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Archetype::HighEfficiency => "high-efficiency learner",
            Archetype::Steady => "steady learner",
            Archetype::NeedsSupport => "needs-support learner",
            Archetype::Passive => "passive/wait-and-see learner",
        }
    }
}

fn cluster_name(cluster_id: usize) -> String {
    Archetype::for_cluster(cluster_id)
        .map(|a| a.name().to_string())
        .unwrap_or_else(|| format!("cluster {cluster_id}"))
}

/// Banded description of a raw-space cluster center.
fn describe(center: &[f64]) -> Vec<String> {
    let at = |name: &str| {
        FeatureSet::Clustering
            .index_of(name)
            .and_then(|i| center.get(i).copied())
            .unwrap_or(0.0)
    };
    let mut out = Vec::new();

    let ability = at("learning_ability");
    out.push(if ability > 80.0 {
        "strong homework results"
    } else if ability > 60.0 {
        "good homework results"
    } else {
        "homework results need improvement"
    });

    let completion = at("completion_rate");
    out.push(if completion > 0.9 {
        "high homework completion"
    } else if completion > 0.7 {
        "moderate homework completion"
    } else {
        "low homework completion"
    });

    let engagement = at("engagement");
    out.push(if engagement > 10.0 {
        "highly active in discussion"
    } else if engagement > 5.0 {
        "fairly active in discussion"
    } else {
        "rarely joins discussion"
    });

    let investment = at("investment");
    out.push(if investment > 200.0 {
        "heavy video investment"
    } else if investment > 100.0 {
        "moderate video investment"
    } else {
        "light video investment"
    });

    let consistency = at("consistency");
    if consistency > 0.8 {
        out.push("steady study rhythm");
    } else if consistency < 0.5 {
        out.push("irregular study rhythm");
    }

    let academic = at("academic_performance");
    if academic >= 85.0 {
        out.push("excellent overall results");
    } else if academic < 60.0 {
        out.push("overall results at risk");
    }

    out.into_iter().map(String::from).collect()
}

/// Training-time view of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster_id: usize,
    pub name: String,
    pub size: usize,
    pub member_ids: Vec<String>,
    /// Centroid in raw (unscaled) feature units
    pub center: Vec<f64>,
    pub characteristics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClustererParams {
    pub kmeans: KMeansModel,
    pub silhouette: Option<f64>,
    pub profiles: Vec<ClusterProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub user_id: String,
    pub cluster_id: usize,
    pub label: String,
    pub characteristics: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterShare {
    pub name: String,
    pub count: usize,
    pub percentage: f64,
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    pub total_users: usize,
    pub cluster_distribution: BTreeMap<usize, ClusterShare>,
}

pub struct BehaviorClusterer {
    policy: TierPolicy,
    extractor: FeatureExtractor,
    state: ModelState<ModelArtifact<ClustererParams>>,
}

impl BehaviorClusterer {
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

    pub fn artifact(&self) -> Option<&ModelArtifact<ClustererParams>> {
        self.state.artifact()
    }

    pub fn restore(&mut self, artifact: ModelArtifact<ClustererParams>) -> Result<(), AnalyticsError> {
        artifact.check_layout(KIND)?;
        if artifact.params.kmeans.k() != artifact.params.profiles.len() {
            return Err(AnalyticsError::IncompatibleArtifact {
                model: KIND.as_str(),
                reason: "cluster profiles do not match centroids".to_string(),
            });
        }
        self.state.install(artifact);
        Ok(())
    }

    pub fn train(&mut self, records: &[StudentRecord]) -> bool {
        report_training(self.try_train(records)).is_some()
    }

    pub fn try_train(&mut self, records: &[StudentRecord]) -> Result<TrainingSummary, AnalyticsError> {
        let model = KIND.as_str();
        let (vectors, ids) = self.extractor.extract(records, FeatureSet::Clustering);
        let n = vectors.len();
        self.policy.ensure_sufficient(model, n)?;
        let plan = self.policy.select(n);
        let k = plan.clusters.min(n);
        info!(model, tier = ?plan.tier, samples = n, clusters = k, "tier selected");

        let mut matrix = to_matrix(&vectors);
        let fences = OutlierFences::fit(&matrix, self.extractor.outlier_policy(FeatureSet::Clustering));
        fences.apply(&mut matrix);
        let scaler = RobustScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix);

        let (kmeans, labels) = KMeansModel::fit(&scaled, k, DEFAULT_N_INIT, DEFAULT_MAX_ITER, plan.seed)
            .map_err(|reason| AnalyticsError::training(model, reason))?;
        let silhouette = silhouette_score(&scaled, &labels);
        info!(model, inertia = kmeans.inertia, silhouette = ?silhouette, "clusters fitted");

        let profiles = build_profiles(&kmeans, &scaler, &matrix, &labels, &ids);
        let params = ClustererParams {
            kmeans,
            silhouette,
            profiles,
        };
        self.state
            .install(ModelArtifact::new(KIND, plan.tier, params, scaler, fences, n));
        Ok(TrainingSummary {
            model: KIND,
            tier: plan.tier,
            samples: n,
            skipped: records.len() - n,
            diagnostic: silhouette,
        })
    }

    fn assign(&self, artifact: &ModelArtifact<ClustererParams>, values: &[f64]) -> usize {
        let mut row = values.to_vec();
        artifact.fences.apply_row(&mut row);
        let scaled = artifact.scaler.transform_row(ArrayView1::from(&row[..]));
        artifact.params.kmeans.predict_row(scaled.view())
    }

    pub fn predict_cluster(&self, record: &StudentRecord) -> Option<ClusterAssignment> {
        let Some(artifact) = self.state.artifact() else {
            log_untrained(KIND, "cluster assignment unavailable");
            return None;
        };
        let vector = match self.extractor.vectorize(record, FeatureSet::Clustering) {
            Ok(v) => v,
            Err(e) => {
                warn!(user_id = %record.user_id, error = %e, "cluster assignment skipped");
                return None;
            }
        };
        let cluster_id = self.assign(artifact, vector.as_slice());
        let characteristics = artifact
            .params
            .profiles
            .get(cluster_id)
            .map(|p| p.characteristics.clone())
            .unwrap_or_default();
        Some(ClusterAssignment {
            user_id: record.user_id.clone(),
            cluster_id,
            label: cluster_name(cluster_id),
            characteristics,
            recommendations: cluster_recommendations(Archetype::for_cluster(cluster_id)),
        })
    }

    /// Membership of every extractable record; every cluster appears, empty or not.
    pub fn get_all_clusters_analysis(&self, records: &[StudentRecord]) -> Option<ClusterAnalysis> {
        let Some(artifact) = self.state.artifact() else {
            log_untrained(KIND, "cluster analysis unavailable");
            return None;
        };
        let (vectors, ids) = self.extractor.extract(records, FeatureSet::Clustering);
        let mut members: Vec<Vec<String>> = vec![Vec::new(); artifact.params.kmeans.k()];
        for (vector, id) in vectors.iter().zip(ids) {
            let c = self.assign(artifact, vector.as_slice());
            if let Some(m) = members.get_mut(c) {
                m.push(id);
            }
        }

        let total = vectors.len();
        let cluster_distribution = members
            .into_iter()
            .enumerate()
            .map(|(c, member_ids)| {
                let count = member_ids.len();
                let percentage = if total > 0 {
                    count as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                let share = ClusterShare {
                    name: cluster_name(c),
                    count,
                    percentage,
                    member_ids,
                };
                (c, share)
            })
            .collect();
        Some(ClusterAnalysis {
            total_users: total,
            cluster_distribution,
        })
    }
}

fn build_profiles(
    kmeans: &KMeansModel,
    scaler: &RobustScaler,
    raw: &Array2<f64>,
    labels: &[usize],
    ids: &[String],
) -> Vec<ClusterProfile> {
    (0..kmeans.k())
        .map(|c| {
            let rows: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, l)| **l == c)
                .map(|(i, _)| i)
                .collect();
            let center: Array1<f64> = if rows.is_empty() {
                scaler.inverse_transform_row(kmeans.centroids.row(c))
            } else {
                let mut sum = Array1::<f64>::zeros(raw.ncols());
                for &i in &rows {
                    sum += &raw.row(i);
                }
                sum / rows.len() as f64
            };
            let center = center.to_vec();
            ClusterProfile {
                cluster_id: c,
                name: cluster_name(c),
                size: rows.len(),
                member_ids: rows.iter().map(|&i| ids[i].clone()).collect(),
                characteristics: describe(&center),
                center,
            }
        })
        .collect()
}
