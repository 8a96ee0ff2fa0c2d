//! Integration test: config load, record loading, feature extraction, tiers,
//! risk thresholds, recommendations, artifact store.

mod common;

use cohort_insight::analysis::{AnomalyCategory, Archetype, GradePredictor};
use cohort_insight::config::{AnalyticsConfig, FeaturesConfig, RiskConfig};
use cohort_insight::error::StoreError;
use cohort_insight::features::{to_matrix, FeatureExtractor, FeatureSet, OutlierFences, OutlierPolicy};
use cohort_insight::model::{ModelKind, RegressorParams, Tier, TierPolicy};
use cohort_insight::recommend::{
    anomaly_remediation, cluster_recommendations, learning_path, learning_profile,
    prediction_recommendations, LearningType, Weakness,
};
use cohort_insight::records::{load_records, Presence, StudentRecord};
use cohort_insight::risk::{AlertLevel, RiskEngine, Severity};
use cohort_insight::storage::ArtifactStore;
use common::{cohort, empty_student, student};
use std::path::Path;

#[test]
fn config_load_default() {
    let c = AnalyticsConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.tiers.min_samples, 3);
    assert_eq!(c.tiers.cluster_counts, [2, 3, 4]);
    assert_eq!(c.tiers.seed, 42);
    assert_eq!(c.features.max_recommendations, 4);
    assert_eq!(c.risk.high_threshold, -0.5);
    assert_eq!(c.schedule.retrain_interval_secs, 0);
}

#[test]
fn config_partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"tiers": {"min_samples": 5}, "log": {"json": false}}"#).unwrap();
    let c = AnalyticsConfig::load(&path);
    assert_eq!(c.tiers.min_samples, 5);
    assert_eq!(c.tiers.medium_min_samples, 15);
    assert!(!c.log.json);
    assert_eq!(c.log.level, "info");
}

#[test]
fn tier_policy_boundaries() {
    let policy = TierPolicy::default();
    assert_eq!(policy.tier_for(3), Tier::Small);
    assert_eq!(policy.tier_for(14), Tier::Small);
    assert_eq!(policy.tier_for(15), Tier::Medium);
    assert_eq!(policy.tier_for(49), Tier::Medium);
    assert_eq!(policy.tier_for(50), Tier::Large);

    let small = policy.select(12);
    assert_eq!(small.regressor, RegressorParams::Ridge { alpha: 1.0 });
    assert_eq!(small.clusters, 2);
    assert_eq!(small.contamination, 0.3);

    let medium = policy.select(40);
    assert_eq!(medium.regressor, RegressorParams::Tree { max_depth: 5 });
    assert_eq!(medium.clusters, 3);
    assert_eq!(medium.contamination, 0.2);

    let large = policy.select(200);
    assert!(matches!(large.regressor, RegressorParams::Forest { .. }));
    assert_eq!(large.clusters, 4);
    assert_eq!(large.contamination, 0.1);

    assert_eq!(policy.select(40), policy.select(40));
    assert!(policy.ensure_sufficient("m", 2).is_err());
    assert!(policy.ensure_sufficient("m", 3).is_ok());
}

#[test]
fn absent_categories_resolve_to_neutral_defaults() {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let empty = empty_student("e");
    for set in [FeatureSet::Prediction, FeatureSet::Clustering, FeatureSet::Anomaly] {
        let v = extractor.vectorize(&empty, set).unwrap();
        assert_eq!(v.values.len(), set.dim());
        assert!(v.values.iter().all(|x| x.is_finite() && *x >= 0.0));
        assert_eq!(v.populated_fraction(), 0.0, "{set:?}");
    }
}

#[test]
fn derived_indicators_follow_formulas() {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let record = StudentRecord::new("f")
        .with_homework(vec![80.0, 0.0, 90.0, 70.0])
        .with_discussion(3, 2, 4)
        .with_video(&[(100.0, 0.2), (50.0, 0.0), (50.0, 0.4)]);

    let v = extractor.vectorize(&record, FeatureSet::Clustering).unwrap();
    assert_eq!(v.get("completion_rate"), Some(0.75));
    assert_eq!(v.get("learning_ability"), Some(80.0));
    // 3·2 + 2 + 4·0.5
    assert_eq!(v.get("engagement"), Some(10.0));
    // 200 minutes, mean non-zero rumination 0.3
    let investment = v.get("investment").unwrap();
    assert!((investment - 140.0).abs() < 1e-9);
    let std = (200.0f64 / 3.0).sqrt();
    let expected = 1.0 / (1.0 + std / (80.0 + 1e-6));
    assert!((v.get("consistency").unwrap() - expected).abs() < 1e-12);
    // no synthesis and no exam: falls back to the homework average
    assert_eq!(v.get("academic_performance"), Some(80.0));

    let with_exam = record.clone().with_exam(66.0);
    let v = extractor.vectorize(&with_exam, FeatureSet::Clustering).unwrap();
    assert_eq!(v.get("academic_performance"), Some(66.0));
    let with_synthesis = with_exam.with_synthesis(77.0, 70.0);
    let v = extractor.vectorize(&with_synthesis, FeatureSet::Clustering).unwrap();
    assert_eq!(v.get("academic_performance"), Some(77.0));
}

#[test]
fn rumination_penalty_is_capped() {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let record = StudentRecord::new("r").with_video(&[(100.0, 0.9)]);
    let v = extractor.vectorize(&record, FeatureSet::Prediction).unwrap();
    assert_eq!(v.get("video_engagement"), Some(50.0));
}

#[test]
fn consistency_is_neutral_below_three_scores() {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let record = StudentRecord::new("c").with_homework(vec![40.0, 0.0, 95.0]);
    let v = extractor.vectorize(&record, FeatureSet::Anomaly).unwrap();
    assert_eq!(v.get("homework_consistency"), Some(0.5));
}

#[test]
fn malformed_record_is_skipped_not_fatal() {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let mut records = cohort(4);
    records.insert(1, StudentRecord::new("bad").with_homework(vec![f64::NAN, 50.0]));
    records.push(StudentRecord::new("neg").with_video(&[(-3.0, 0.1)]));
    records.push(StudentRecord::new("long").with_homework(vec![50.0; 9]));

    let (vectors, ids) = extractor.extract(&records, FeatureSet::Prediction);
    assert_eq!(vectors.len(), 4);
    assert_eq!(ids, vec!["u000", "u001", "u002", "u003"]);
    assert!(ids.iter().zip(&vectors).all(|(id, v)| *id == v.user_id));

    let mut predictor = GradePredictor::new(&AnalyticsConfig::default());
    let summary = predictor.try_train(&records).unwrap();
    assert_eq!(summary.samples, 4);
    assert_eq!(summary.skipped, 3);
}

#[test]
fn fences_clip_or_flag_by_policy() {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let mut records = cohort(9);
    records.push(
        StudentRecord::new("extreme")
            .with_homework(vec![60.0; 8])
            .with_discussion(400, 0, 0)
            .with_synthesis(60.0, 55.0),
    );
    let (vectors, _) = extractor.extract(&records, FeatureSet::Prediction);
    let mut m = to_matrix(&vectors);
    let col = FeatureSet::Prediction.index_of("discussion_activity").unwrap();
    let raw = m[[9, col]];

    let flag = OutlierFences::fit(&m, OutlierPolicy::Flag(2.0));
    assert!(flag.flagged(vectors[9].as_slice()).contains(&col));
    let mut flagged = m.clone();
    flag.apply(&mut flagged);
    assert_eq!(flagged[[9, col]], raw);

    let clip = OutlierFences::fit(&m, OutlierPolicy::Clip(1.5));
    clip.apply(&mut m);
    assert!(m[[9, col]] < raw);
    assert_eq!(m[[9, col]], clip.upper[col]);
}

#[test]
fn presence_serializes_as_null() {
    let record = StudentRecord::new("p").with_exam(70.0);
    let json = serde_json::to_value(&record).unwrap();
    assert!(json["homework"].is_null());
    assert_eq!(json["exam"]["score"], 70.0);

    let parsed: StudentRecord = serde_json::from_str(r#"{"user_id": "q", "discussion": {"posted": 1, "replied": 2, "upvotes": 3}}"#).unwrap();
    assert!(parsed.discussion.is_present());
    assert_eq!(parsed.video, Presence::Absent);
    assert_eq!(parsed.synthesis, Presence::Absent);
}

#[test]
fn loader_reads_file_and_directory() {
    let dir = tempfile::tempdir().unwrap();
    let records = cohort(3);
    let single = dir.path().join("single.json");
    std::fs::write(&single, serde_json::to_string(&records[0]).unwrap()).unwrap();
    assert_eq!(load_records(&single).unwrap().len(), 1);

    let nested = dir.path().join("term-2");
    std::fs::create_dir(&nested).unwrap();
    std::fs::write(nested.join("cohort.json"), serde_json::to_string(&records[1..]).unwrap()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not json").unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ nope").unwrap();

    let loaded = load_records(dir.path()).unwrap();
    assert_eq!(loaded.len(), 3);
    assert!(load_records(&dir.path().join("missing")).is_err());
}

#[test]
fn risk_engine_thresholds() {
    let engine = RiskEngine::new(RiskConfig::default());
    assert_eq!(engine.severity(-0.9), Severity::High);
    assert_eq!(engine.severity(-0.3), Severity::Medium);
    assert_eq!(engine.severity(-0.1), Severity::Low);
    assert_eq!(engine.alert_level(-0.1, true, false), AlertLevel::Urgent);
    assert_eq!(engine.alert_level(-0.1, false, true), AlertLevel::Warning);
    assert_eq!(engine.alert_level(-0.3, false, false), AlertLevel::Warning);
    assert_eq!(engine.alert_level(-0.1, false, false), AlertLevel::Attention);
}

#[test]
fn anomaly_categories_follow_scaled_thresholds() {
    let dim = FeatureSet::Anomaly.dim();
    let idx = |n: &str| FeatureSet::Anomaly.index_of(n).unwrap();

    assert_eq!(AnomalyCategory::classify(&vec![0.0; dim]), vec![AnomalyCategory::Unknown]);

    let mut v = vec![0.0; dim];
    v[idx("academic_performance")] = -2.0;
    v[idx("homework_completion_rate")] = 1.0;
    v[idx("engagement_score")] = -1.5;
    let tags = AnomalyCategory::classify(&v);
    assert!(tags.contains(&AnomalyCategory::PoorPerformance));
    assert!(tags.contains(&AnomalyCategory::InconsistentBehavior));
    assert!(tags.contains(&AnomalyCategory::LowEngagement));
    assert!(!tags.contains(&AnomalyCategory::ExcessiveStruggle));

    let mut v = vec![0.0; dim];
    v[idx("video_rumination_ratio")] = 2.0;
    v[idx("homework_consistency")] = -1.2;
    assert_eq!(
        AnomalyCategory::classify(&v),
        vec![AnomalyCategory::IrregularPattern, AnomalyCategory::ExcessiveStruggle]
    );
}

#[test]
fn prediction_rules_are_capped() {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let v = extractor
        .vectorize(&empty_student("e"), FeatureSet::Prediction)
        .unwrap();
    // neutral consistency (0.5) sits exactly on its threshold and does not fire
    let all = prediction_recommendations(&v, 10);
    assert_eq!(all.len(), 5);
    assert_eq!(prediction_recommendations(&v, 4).len(), 4);

    let strong = extractor
        .vectorize(&student("s", 1.0, 0.0), FeatureSet::Prediction)
        .unwrap();
    assert!(prediction_recommendations(&strong, 4).is_empty());
}

#[test]
fn remediation_is_deduplicated_and_capped() {
    let steps = anomaly_remediation(&[
        AnomalyCategory::PoorPerformance,
        AnomalyCategory::LowEngagement,
        AnomalyCategory::PoorPerformance,
    ]);
    assert_eq!(steps.len(), 5);
    let mut unique = steps.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), steps.len());
    assert!(anomaly_remediation(&[AnomalyCategory::Unknown]).is_empty());

    assert_eq!(cluster_recommendations(Archetype::for_cluster(2)).len(), 3);
    assert_eq!(cluster_recommendations(None).len(), 1);
}

#[test]
fn learning_profile_bands() {
    let weak = StudentRecord::new("w")
        .with_homework(vec![50.0, 0.0, 55.0, 0.0, 52.0])
        .with_discussion(1, 0, 1)
        .with_video(&[(40.0, 0.5)])
        .with_synthesis(55.0, 50.0);
    let profile = learning_profile(&weak).unwrap();
    assert_eq!(profile.learning_type, LearningType::PassiveLearner);
    for w in [
        Weakness::LowHomeworkScores,
        Weakness::LowCompletion,
        Weakness::LowDiscussion,
        Weakness::LowVideoTime,
        Weakness::HighRumination,
    ] {
        assert!(profile.weaknesses.contains(&w), "missing {w:?}");
    }
    assert!(profile.resources.len() <= 6);
    assert!(profile.weekly_goals.len() <= 4);
    assert_eq!(profile.strategies.len(), 5);

    let strong = StudentRecord::new("s")
        .with_homework(vec![92.0, 90.0, 94.0, 91.0])
        .with_discussion(8, 6, 4)
        .with_video(&[(200.0, 0.1), (150.0, 0.1)])
        .with_synthesis(93.0, 90.0);
    let profile = learning_profile(&strong).unwrap();
    assert_eq!(profile.learning_type, LearningType::HighPerformer);
    assert!(profile.weaknesses.is_empty());
    assert_eq!(profile.strengths.len(), 4);

    assert_eq!(
        learning_profile(&empty_student("e")).unwrap().learning_type,
        LearningType::Unknown
    );
}

#[test]
fn learning_path_milestones() {
    let record = StudentRecord::new("l").with_synthesis(62.0, 60.0);
    let path = learning_path(&record, None).unwrap();
    assert_eq!(path.target_score, 72.0);
    assert_eq!(path.gap, 10.0);
    assert_eq!(path.estimated_weeks, 5);
    assert_eq!(path.milestones.len(), 3);
    assert_eq!(path.milestones[2].target_score, 72.0);
    assert!(path.milestones.windows(2).all(|w| w[0].week <= w[1].week));

    let far = learning_path(&record, Some(95.0)).unwrap();
    assert_eq!(far.priority_actions.len(), 3);
    assert_eq!(learning_path(&record, Some(63.0)).unwrap().estimated_weeks, 2);
}

#[test]
fn storage_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifacts.db");
    let store = ArtifactStore::open(&path, b"test-secret").unwrap();

    let mut predictor = GradePredictor::new(&AnalyticsConfig::default());
    assert!(predictor.train(&cohort(10)));
    let artifact = predictor.artifact().unwrap();
    store.save(artifact).unwrap();

    let loaded = store
        .load_latest::<cohort_insight::analysis::PredictorParams>(ModelKind::GradePredictor)
        .unwrap()
        .unwrap();
    assert_eq!(&loaded, artifact);
    assert!(store
        .load_latest::<cohort_insight::analysis::ClustererParams>(ModelKind::BehaviorClusterer)
        .unwrap()
        .is_none());

    let history = store.history(ModelKind::GradePredictor).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, artifact.id.to_string());
    assert_eq!(history[0].sample_count, 10);
}

#[test]
fn storage_newest_wins_and_prune() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(&dir.path().join("a.db"), b"k").unwrap();
    let mut predictor = GradePredictor::new(&AnalyticsConfig::default());

    assert!(predictor.train(&cohort(8)));
    let mut old = predictor.artifact().unwrap().clone();
    old.trained_at = old.trained_at - chrono::Duration::days(30);
    store.save(&old).unwrap();

    assert!(predictor.train(&cohort(12)));
    let new = predictor.artifact().unwrap().clone();
    store.save(&new).unwrap();

    let latest = store
        .load_latest::<cohort_insight::analysis::PredictorParams>(ModelKind::GradePredictor)
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, new.id);

    let cutoff = chrono::Utc::now() - chrono::Duration::days(1);
    assert_eq!(store.prune_before(cutoff).unwrap(), 1);
    assert_eq!(store.history(ModelKind::GradePredictor).unwrap().len(), 1);
}

#[test]
fn storage_wrong_secret_fails_to_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");
    let mut predictor = GradePredictor::new(&AnalyticsConfig::default());
    assert!(predictor.train(&cohort(6)));
    {
        let store = ArtifactStore::open(&path, b"right").unwrap();
        store.save(predictor.artifact().unwrap()).unwrap();
    }
    let store = ArtifactStore::open(&path, b"wrong").unwrap();
    let result = store.load_latest::<cohort_insight::analysis::PredictorParams>(ModelKind::GradePredictor);
    assert!(matches!(result, Err(StoreError::Crypto)));
}
