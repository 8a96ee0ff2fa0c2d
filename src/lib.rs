//! Cohort Insight: adaptive learning analytics for small student cohorts.
//!
//! Modular structure:
//! - [`records`] — Student record aggregate and cohort file loading
//! - [`features`] — Derived indicators and per-model feature vectors
//! - [`model`] — Tier policy, scaler, regressors, k-means, isolation forest
//! - [`analysis`] — Grade prediction, behavioral clustering, anomaly detection
//! - [`risk`] — Severity and alert levels for anomaly scores
//! - [`recommend`] — Rule-table guidance, learning profile and path
//! - [`storage`] — Encrypted artifact store
//! - [`logging`] — Structured JSON logging

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod recommend;
pub mod records;
pub mod risk;
pub mod storage;

pub use analysis::{AnomalyDetector, BehaviorClusterer, CohortAnalyzer, GradePredictor};
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, StoreError};
pub use features::{FeatureExtractor, FeatureSet, FeatureVector};
pub use logging::StructuredLogger;
pub use model::{ModelArtifact, ModelKind, TierPolicy};
pub use records::{Presence, StudentRecord};
pub use risk::RiskEngine;
pub use storage::ArtifactStore;
