//! SQLite-backed artifact history. Payloads are serialized to JSON, sealed with
//! AES-256-GCM under a key derived from the caller's secret, and checked
//! against a SHA-256 digest of the plaintext on load.

use crate::error::StoreError;
use crate::model::{ModelArtifact, ModelKind};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String, StoreError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| StoreError::Crypto)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), plaintext)
        .map_err(|_| StoreError::Crypto)?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>, StoreError> {
    let raw = BASE64.decode(encoded)?;
    if raw.len() < NONCE_LEN {
        return Err(StoreError::Truncated);
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| StoreError::Crypto)?;
    cipher.decrypt(nonce.into(), ct).map_err(|_| StoreError::Crypto)
}

fn checksum(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// One row of artifact history, without its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub id: String,
    pub kind: String,
    pub trained_at: DateTime<Utc>,
    pub sample_count: usize,
}

pub struct ArtifactStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl ArtifactStore {
    /// Open or create the store at `path`, keyed by `secret`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                trained_at INTEGER NOT NULL,
                sample_count INTEGER NOT NULL,
                payload_enc TEXT NOT NULL,
                checksum TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_artifacts_kind ON artifacts(kind, trained_at);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: derive_key(secret),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Append an artifact to the history of its kind.
    pub fn save<P: Serialize>(&self, artifact: &ModelArtifact<P>) -> Result<(), StoreError> {
        let plain = serde_json::to_vec(artifact)?;
        let enc = encrypt(&self.key, &plain)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO artifacts (id, kind, trained_at, sample_count, payload_enc, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                artifact.id.to_string(),
                artifact.kind.as_str(),
                artifact.trained_at.timestamp_millis(),
                artifact.sample_count as i64,
                enc,
                checksum(&plain),
            ],
        )?;
        info!(id = %artifact.id, kind = artifact.kind.as_str(), "artifact saved");
        Ok(())
    }

    /// Newest artifact of `kind`, or `None` if none was ever saved.
    pub fn load_latest<P: DeserializeOwned>(
        &self,
        kind: ModelKind,
    ) -> Result<Option<ModelArtifact<P>>, StoreError> {
        let row: Option<(String, String, String)> = self
            .conn()?
            .query_row(
                "SELECT id, payload_enc, checksum FROM artifacts
                 WHERE kind = ?1 ORDER BY trained_at DESC, seq DESC LIMIT 1",
                params![kind.as_str()],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;
        let Some((id, enc, expected)) = row else {
            return Ok(None);
        };
        let plain = decrypt(&self.key, &enc)?;
        if checksum(&plain) != expected {
            return Err(StoreError::Integrity { id });
        }
        debug!(%id, kind = kind.as_str(), "artifact loaded");
        Ok(Some(serde_json::from_slice(&plain)?))
    }

    /// History of `kind`, newest first.
    pub fn history(&self, kind: ModelKind) -> Result<Vec<StoredArtifact>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, trained_at, sample_count FROM artifacts
             WHERE kind = ?1 ORDER BY trained_at DESC, seq DESC",
        )?;
        let rows = stmt.query_map(params![kind.as_str()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, i64>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, kind, ts, samples) = row?;
            out.push(StoredArtifact {
                id,
                kind,
                trained_at: Utc.timestamp_millis_opt(ts).single().unwrap_or_default(),
                sample_count: samples.max(0) as usize,
            });
        }
        Ok(out)
    }

    /// Retention: delete artifacts trained before `ts`.
    pub fn prune_before(&self, ts: DateTime<Utc>) -> Result<u64, StoreError> {
        let n = self.conn()?.execute(
            "DELETE FROM artifacts WHERE trained_at < ?1",
            params![ts.timestamp_millis()],
        )?;
        Ok(n as u64)
    }
}
