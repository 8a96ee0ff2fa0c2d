//! Model-level properties: sufficiency, range, determinism, persistence, scenarios.

mod common;

use cohort_insight::analysis::{
    AnomalyCategory, AnomalyDetector, BehaviorClusterer, CohortAnalyzer, Confidence, GradePredictor,
};
use cohort_insight::config::AnalyticsConfig;
use cohort_insight::error::AnalyticsError;
use cohort_insight::model::{ModelArtifact, ModelKind, Tier};
use cohort_insight::records::StudentRecord;
use cohort_insight::risk::{AlertLevel, Severity};
use cohort_insight::storage::ArtifactStore;
use common::{cohort, empty_student, scenario_a, scenario_b, scenario_c, student};

fn config() -> AnalyticsConfig {
    AnalyticsConfig::default()
}

#[test]
fn fewer_than_three_samples_never_trains() {
    let cfg = config();
    let records = cohort(2);
    let mut predictor = GradePredictor::new(&cfg);
    let mut clusterer = BehaviorClusterer::new(&cfg);
    let mut detector = AnomalyDetector::new(&cfg);

    assert!(!predictor.train(&records));
    assert!(!clusterer.train(&records));
    assert!(!detector.train(&records));
    assert!(!predictor.is_trained());
    assert!(!clusterer.is_trained());
    assert!(!detector.is_trained());

    let probe = &records[0];
    assert!(predictor.predict(probe).is_none());
    assert!(clusterer.predict_cluster(probe).is_none());
    assert!(clusterer.get_all_clusters_analysis(&records).is_none());
    assert!(detector.detect_anomalies(probe).is_none());
    assert!(detector.batch_detect_anomalies(&records).is_none());
}

#[test]
fn try_train_reports_insufficient_data() {
    let mut predictor = GradePredictor::new(&config());
    match predictor.try_train(&cohort(2)) {
        Err(AnalyticsError::InsufficientData {
            available,
            required,
            ..
        }) => {
            assert_eq!(available, 2);
            assert_eq!(required, 3);
        }
        other => panic!("expected insufficient data, got {other:?}"),
    }
}

#[test]
fn records_without_target_do_not_count_towards_predictor_minimum() {
    let mut records = cohort(2);
    records.push(StudentRecord::new("no-target").with_homework(vec![70.0, 80.0, 75.0]));
    records.push(StudentRecord::new("zero-target").with_synthesis(0.0, 10.0));
    let mut predictor = GradePredictor::new(&config());
    assert!(!predictor.train(&records));

    // the clusterer has no target and sees four usable records
    let mut clusterer = BehaviorClusterer::new(&config());
    assert!(clusterer.train(&records));
}

#[test]
fn failed_retrain_keeps_previous_artifact() {
    let mut predictor = GradePredictor::new(&config());
    assert!(predictor.train(&cohort(12)));
    let before = predictor.artifact().map(|a| a.id);
    assert!(!predictor.train(&cohort(1)));
    assert!(predictor.is_trained());
    assert_eq!(predictor.artifact().map(|a| a.id), before);
}

#[test]
fn predictions_stay_within_score_range() {
    let mut predictor = GradePredictor::new(&config());
    assert!(predictor.train(&cohort(30)));

    let probes = vec![
        student("max", 1.0, 0.0).with_synthesis(100.0, 100.0),
        student("min", 0.0, 0.0),
        StudentRecord::new("huge")
            .with_homework(vec![100.0; 8])
            .with_discussion(500, 500, 5000)
            .with_video(&[(10_000.0, 0.0); 7]),
        empty_student("nobody"),
    ];
    for probe in &probes {
        let result = predictor.predict(probe).unwrap();
        assert!(
            (0.0..=100.0).contains(&result.predicted_score),
            "{} predicted {}",
            probe.user_id,
            result.predicted_score
        );
    }
}

#[test]
fn tier_follows_sample_count() {
    let cfg = config();
    let cases = [(12, Tier::Small, 2), (40, Tier::Medium, 3), (60, Tier::Large, 4)];
    for (n, tier, clusters) in cases {
        let records = cohort(n);
        let mut predictor = GradePredictor::new(&cfg);
        let mut clusterer = BehaviorClusterer::new(&cfg);
        let mut detector = AnomalyDetector::new(&cfg);

        let p = predictor.try_train(&records).unwrap();
        let c = clusterer.try_train(&records).unwrap();
        let d = detector.try_train(&records).unwrap();
        assert_eq!((p.tier, c.tier, d.tier), (tier, tier, tier), "n = {n}");

        let clusterer_params = &clusterer.artifact().unwrap().params;
        assert_eq!(clusterer_params.kmeans.k(), clusters);
        assert_eq!(clusterer_params.profiles.len(), clusters);

        let regressor = predictor.artifact().unwrap().params.regressor.name();
        let expected = match tier {
            Tier::Small => "ridge",
            Tier::Medium => "decision_tree",
            Tier::Large => "bagged_forest",
        };
        assert_eq!(regressor, expected);
    }
}

#[test]
fn cluster_count_is_capped_by_samples() {
    let mut cfg = config();
    cfg.tiers.cluster_counts = [5, 5, 5];
    let mut clusterer = BehaviorClusterer::new(&cfg);
    assert!(clusterer.train(&cohort(3)));
    assert_eq!(clusterer.artifact().unwrap().params.kmeans.k(), 3);
}

#[test]
fn training_is_idempotent() {
    let cfg = config();
    for n in [8, 25, 55] {
        let records = cohort(n);
        let probe = student("probe", 0.63, 1.3);

        let mut p1 = GradePredictor::new(&cfg);
        let mut p2 = GradePredictor::new(&cfg);
        assert!(p1.train(&records) && p2.train(&records));
        assert_eq!(p1.predict(&probe), p2.predict(&probe), "n = {n}");

        let mut c1 = BehaviorClusterer::new(&cfg);
        let mut c2 = BehaviorClusterer::new(&cfg);
        assert!(c1.train(&records) && c2.train(&records));
        assert_eq!(c1.predict_cluster(&probe), c2.predict_cluster(&probe));

        let mut d1 = AnomalyDetector::new(&cfg);
        let mut d2 = AnomalyDetector::new(&cfg);
        assert!(d1.train(&records) && d2.train(&records));
        assert_eq!(d1.detect_anomalies(&probe), d2.detect_anomalies(&probe));
    }
}

#[test]
fn store_round_trip_reproduces_outputs() {
    let cfg = config();
    let records = cohort(24);
    let probe = student("held-out", 0.41, 2.1);

    let mut trained = CohortAnalyzer::new(&cfg);
    assert_eq!(trained.train_all(&records).trained_count(), 3);

    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(&dir.path().join("artifacts.db"), b"test-secret").unwrap();
    assert_eq!(trained.save(&store).unwrap(), 3);

    let mut restored = CohortAnalyzer::new(&cfg);
    assert_eq!(restored.restore(&store).unwrap(), 3);

    assert_eq!(
        trained.predictor().predict(&probe),
        restored.predictor().predict(&probe)
    );
    assert_eq!(
        trained.clusterer().predict_cluster(&probe),
        restored.clusterer().predict_cluster(&probe)
    );
    assert_eq!(
        trained.detector().detect_anomalies(&probe),
        restored.detector().detect_anomalies(&probe)
    );
    assert_eq!(
        trained.predictor().artifact(),
        restored.predictor().artifact()
    );
}

#[test]
fn json_round_trip_of_artifact_is_exact() {
    let mut detector = AnomalyDetector::new(&config());
    assert!(detector.train(&cohort(16)));
    let artifact = detector.artifact().unwrap();
    let json = serde_json::to_string(artifact).unwrap();
    let back: ModelArtifact<cohort_insight::analysis::AnomalyParams> =
        serde_json::from_str(&json).unwrap();
    assert_eq!(&back, artifact);

    let mut fresh = AnomalyDetector::new(&config());
    fresh.restore(back).unwrap();
    let probe = student("p", 0.2, 0.5);
    assert_eq!(fresh.detect_anomalies(&probe), detector.detect_anomalies(&probe));
}

#[test]
fn restore_rejects_artifact_of_another_kind() {
    let mut predictor = GradePredictor::new(&config());
    assert!(predictor.train(&cohort(10)));
    let mut artifact = predictor.artifact().unwrap().clone();
    artifact.kind = ModelKind::AnomalyDetector;

    let mut other = GradePredictor::new(&config());
    assert!(matches!(
        other.restore(artifact),
        Err(AnalyticsError::IncompatibleArtifact { .. })
    ));
    assert!(!other.is_trained());
}

#[test]
fn empty_record_is_scored_without_error() {
    let cfg = config();
    let records = cohort(20);
    let mut analyzer = CohortAnalyzer::new(&cfg);
    assert_eq!(analyzer.train_all(&records).trained_count(), 3);

    let empty = empty_student("ghost");
    let prediction = analyzer.predictor().predict(&empty).unwrap();
    assert!(prediction.predicted_score.is_finite());
    assert_eq!(prediction.confidence, Confidence::Low);
    assert!(analyzer.clusterer().predict_cluster(&empty).is_some());
    let detection = analyzer.detector().detect_anomalies(&empty).unwrap();
    assert!(detection.score.is_finite());
}

#[test]
fn feature_importance_covers_every_feature() {
    let mut predictor = GradePredictor::new(&config());
    assert!(predictor.train(&cohort(20)));
    let result = predictor.predict(&student("x", 0.5, 0.0)).unwrap();
    assert_eq!(result.feature_importance.len(), 8);
    let total: f64 = result.feature_importance.values().sum();
    assert!((total - 1.0).abs() < 1e-6 || total == 0.0, "sum {total}");
    assert!(result.feature_importance.values().all(|w| *w >= 0.0));
}

#[test]
fn scenario_sparse_student_gets_low_confidence() {
    let records = scenario_a();
    let mut predictor = GradePredictor::new(&config());
    let summary = predictor.try_train(&records).unwrap();
    assert_eq!(summary.samples, 5);
    assert_eq!(summary.tier, Tier::Small);

    let sparse = predictor.predict(&records[0]).unwrap();
    assert_eq!(sparse.confidence, Confidence::Low);
    assert!(!sparse.recommendations.is_empty());
    assert!(sparse.recommendations.len() <= 4);

    let strong = predictor.predict(&records[1]).unwrap();
    assert_ne!(strong.confidence, Confidence::Low);
}

#[test]
fn scenario_two_completion_groups_form_three_clusters() {
    let records = scenario_b();
    let mut clusterer = BehaviorClusterer::new(&config());
    let summary = clusterer.try_train(&records).unwrap();
    assert_eq!(summary.tier, Tier::Medium);
    assert_eq!(clusterer.artifact().unwrap().params.kmeans.k(), 3);

    let analysis = clusterer.get_all_clusters_analysis(&records).unwrap();
    assert_eq!(analysis.total_users, 20);
    assert_eq!(analysis.cluster_distribution.len(), 3);
    let pct: f64 = analysis.cluster_distribution.values().map(|s| s.percentage).sum();
    assert!((pct - 100.0).abs() < 1e-9, "percentages sum to {pct}");
    let members: usize = analysis.cluster_distribution.values().map(|s| s.count).sum();
    assert_eq!(members, 20);

    // the two completion groups never share a cluster
    let low = clusterer.predict_cluster(&records[0]).unwrap().cluster_id;
    let high = clusterer.predict_cluster(&records[1]).unwrap().cluster_id;
    assert_ne!(low, high);

    let assignment = clusterer.predict_cluster(&records[1]).unwrap();
    assert!(!assignment.label.is_empty());
    assert!(!assignment.characteristics.is_empty());
    assert!(!assignment.recommendations.is_empty());
}

#[test]
fn scenario_extreme_student_is_high_severity_poor_performance() {
    let records = scenario_c();
    let mut detector = AnomalyDetector::new(&config());
    let summary = detector.try_train(&records).unwrap();
    assert_eq!(summary.tier, Tier::Small);
    assert_eq!(detector.artifact().unwrap().params.forest.contamination, 0.3);

    let outlier = records.last().unwrap();
    let detection = detector.detect_anomalies(outlier).unwrap();
    assert!(detection.is_anomaly);
    assert_eq!(detection.severity, Severity::High);
    assert!(detection.categories.contains(&AnomalyCategory::PoorPerformance));
    assert_eq!(detection.alert_level, Some(AlertLevel::Urgent));
    assert_eq!(detection.confidence, Confidence::High);
    assert!(!detection.recommendations.is_empty());
    assert!(detection.recommendations.len() <= 5);

    let report = detector.batch_detect_anomalies(&records).unwrap();
    assert_eq!(report.total_users, 7);
    assert_eq!(report.anomaly_count + report.normal_count, 7);
    let first = &report.anomalies[0];
    assert_eq!(first.user_id, "outlier");
    assert_eq!(first.severity, Severity::High);
    assert!(report
        .anomalies
        .windows(2)
        .all(|w| w[0].score <= w[1].score));
    assert!(report.summary_text.contains("high-risk"));
    assert!(!first.outlier_features.is_empty());
}

#[test]
fn normal_detection_has_no_alert() {
    let records = scenario_c();
    let mut detector = AnomalyDetector::new(&config());
    assert!(detector.train(&records));
    let report = detector.artifact().unwrap().params.training_report.clone();
    let flagged: Vec<&str> = report.anomalies.iter().map(|a| a.user_id.as_str()).collect();
    let normal = records
        .iter()
        .find(|r| !flagged.contains(&r.user_id.as_str()))
        .unwrap();
    let detection = detector.detect_anomalies(normal).unwrap();
    assert!(!detection.is_anomaly);
    assert_eq!(detection.severity, Severity::Normal);
    assert!(detection.categories.is_empty());
    assert!(detection.alert_level.is_none());
}

#[test]
fn cohort_report_bundles_all_results() {
    let records = cohort(18);
    let mut analyzer = CohortAnalyzer::new(&config());
    analyzer.train_all(&records);
    let report = analyzer.analyze(&records);
    assert_eq!(report.total_records, 18);
    assert_eq!(report.predictions.len(), 18);
    assert_eq!(report.clusters.unwrap().total_users, 18);
    let anomalies = report.anomalies.unwrap();
    assert!(anomalies.anomaly_rate >= 0.0 && anomalies.anomaly_rate <= 100.0);
}
