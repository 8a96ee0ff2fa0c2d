//! Artifact store benchmark: encrypt+insert and load+verify+decrypt.

use cohort_insight::analysis::{AnomalyParams, CohortAnalyzer};
use cohort_insight::config::AnalyticsConfig;
use cohort_insight::model::ModelKind;
use cohort_insight::records::StudentRecord;
use cohort_insight::storage::ArtifactStore;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::tempdir;

fn trained_analyzer() -> CohortAnalyzer {
    let records: Vec<StudentRecord> = (0..40)
        .map(|i| {
            let base = 50.0 + (i % 9) as f64 * 5.0;
            StudentRecord::new(format!("s{i}"))
                .with_homework(vec![base, base + 1.0, base - 1.0, 0.0])
                .with_discussion(i % 5, i % 3, i % 4)
                .with_video(&[(30.0 + base, 0.1)])
                .with_synthesis(base, base - 5.0)
        })
        .collect();
    let mut analyzer = CohortAnalyzer::new(&AnalyticsConfig::default());
    analyzer.train_all(&records);
    analyzer
}

fn bench_save(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::open(&dir.path().join("artifacts.db"), b"bench-secret").unwrap();
    let analyzer = trained_analyzer();

    c.bench_function("storage_save_all_artifacts", |b| {
        b.iter(|| black_box(analyzer.save(&store)).unwrap())
    });
}

fn bench_load(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::open(&dir.path().join("artifacts.db"), b"bench-secret").unwrap();
    let analyzer = trained_analyzer();
    analyzer.save(&store).unwrap();

    c.bench_function("storage_load_anomaly_artifact", |b| {
        b.iter(|| {
            black_box(store.load_latest::<AnomalyParams>(ModelKind::AnomalyDetector)).unwrap()
        })
    });
}

criterion_group!(benches, bench_save, bench_load);
criterion_main!(benches);
