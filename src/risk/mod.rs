//! Severity and alert classification for anomaly scores.

mod engine;

pub use engine::{AlertLevel, RiskEngine, Severity};
