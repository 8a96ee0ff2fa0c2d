//! Cohort Insight entrypoint: loads the cohort, trains the three models,
//! writes a cohort report and persists artifacts. Runs a single cycle, or a
//! retrain loop when `schedule.retrain_interval_secs` is set.

use cohort_insight::{
    analysis::{CohortAnalyzer, CohortReport},
    config::AnalyticsConfig,
    logging::{ReportEvent, StructuredLogger},
    records::load_records,
    storage::ArtifactStore,
};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

fn emit_report(report: &CohortReport, w: &mut impl Write) {
    for p in &report.predictions {
        let mut ev = ReportEvent::new("prediction");
        ev.user_id = Some(p.user_id.as_str());
        ev.model = Some("grade_predictor");
        ev.score = Some(p.predicted_score);
        ev.severity = Some(p.confidence.as_str());
        StructuredLogger::emit_json(&ev, w);
    }
    if let Some(anomalies) = &report.anomalies {
        for a in &anomalies.anomalies {
            let mut ev = ReportEvent::new("anomaly");
            ev.user_id = Some(a.user_id.as_str());
            ev.model = Some("anomaly_detector");
            ev.score = Some(a.score);
            ev.severity = Some(a.severity.as_str());
            StructuredLogger::emit_json(&ev, w);
        }
        let mut ev = ReportEvent::new("anomaly_summary");
        ev.message = Some(anomalies.summary_text.as_str());
        StructuredLogger::emit_json(&ev, w);
    }
}

fn run_one_cycle(
    config: &AnalyticsConfig,
    analyzer: &mut CohortAnalyzer,
    store: &ArtifactStore,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let records = load_records(&config.records_path)?;
    info!(count = records.len(), path = ?config.records_path, "loaded records");

    let outcome = analyzer.train_all(&records);
    if outcome.trained_count() > 0 {
        let saved = analyzer.save(store)?;
        info!(saved, "artifacts persisted");
    }

    let report = analyzer.analyze(&records);
    let report_path = config.data_dir.join("report.json");
    std::fs::write(&report_path, serde_json::to_vec_pretty(&report)?)?;
    info!(path = ?report_path, "cohort report written");

    let stdout = std::io::stdout();
    emit_report(&report, &mut stdout.lock());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("COHORT_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = AnalyticsConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(data_dir = ?config.data_dir, "cohort-insight starting");

    std::fs::create_dir_all(&config.data_dir)?;
    let store_path = config.data_dir.join("artifacts.db");
    let secret = std::env::var("COHORT_STORE_SECRET")
        .unwrap_or_else(|_| "cohort-insight-local-secret".to_string());
    let store = ArtifactStore::open(&store_path, secret.as_bytes())?;

    let mut analyzer = CohortAnalyzer::new(&config);
    match analyzer.restore(&store) {
        Ok(n) => info!(restored = n, "stored artifacts loaded"),
        Err(e) => warn!(error = %e, "stored artifacts unavailable"),
    }

    let interval_secs = config.schedule.retrain_interval_secs;
    if interval_secs > 0 {
        info!(interval_secs, "retrain loop (Ctrl+C to stop)");
        static STOP: AtomicBool = AtomicBool::new(false);
        let _ = ctrlc::set_handler(|| {
            STOP.store(true, Ordering::Relaxed);
        });
        let mut cycle: u64 = 0;
        while !STOP.load(Ordering::Relaxed) {
            cycle += 1;
            if let Err(e) = run_one_cycle(&config, &mut analyzer, &store) {
                error!(cycle, error = %e, "cycle failed");
            }
            // one-second slices, stop flag checked between them
            let mut waited = 0;
            while waited < interval_secs && !STOP.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_secs(1));
                waited += 1;
            }
        }
        info!(cycles = cycle, "stopped");
    } else {
        run_one_cycle(&config, &mut analyzer, &store)?;
    }

    Ok(())
}
