//! Error taxonomy for the analytics core and the artifact store.
//!
//! Model components never surface [`AnalyticsError`] through their public
//! `train`/inference calls; those map it to `bool`/`Option` after logging.
//! `try_train` is the only place it escapes, for callers that want the reason.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{model}: insufficient data ({available} valid samples, at least {required} required)")]
    InsufficientData {
        model: &'static str,
        available: usize,
        required: usize,
    },

    #[error("{model}: inference requested before training")]
    UntrainedModel { model: &'static str },

    #[error("record {user_id} skipped: {reason}")]
    RecordExtraction { user_id: String, reason: String },

    #[error("{model}: training failed: {reason}")]
    ModelTraining { model: &'static str, reason: String },

    #[error("{model}: artifact does not fit this model: {reason}")]
    IncompatibleArtifact { model: &'static str, reason: String },
}

impl AnalyticsError {
    pub fn training(model: &'static str, reason: impl Into<String>) -> Self {
        Self::ModelTraining {
            model,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("encryption failure")]
    Crypto,

    #[error("payload too short")]
    Truncated,

    #[error("checksum mismatch for artifact {id}")]
    Integrity { id: String },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
