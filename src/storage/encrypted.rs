//! SQLite-backed append-only record store. Payloads are AES-GCM encrypted;
//! session id, kind and timestamp stay in the clear for lookup.

use crate::error::{EngineError, Result};
use crate::session::StageRecord;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{TimeZone, Utc};
use rand::RngCore;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(secret: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, secret);
    out.copy_from_slice(&h.as_ref()[..KEY_LEN]);
    out
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| EngineError::Storage(format!("cipher init: {e}")))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), plaintext)
        .map_err(|_| EngineError::Storage("payload encryption failed".into()))?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| EngineError::Storage(format!("payload encoding: {e}")))?;
    if raw.len() < NONCE_LEN {
        return Err(EngineError::Storage("payload too short".into()));
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| EngineError::Storage(format!("cipher init: {e}")))?;
    cipher
        .decrypt(nonce.into(), ct)
        .map_err(|_| EngineError::Storage("payload decryption failed (wrong secret?)".into()))
}

fn finalized(conn: &Connection, session_id: &str) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM records WHERE session_id = ?1 AND kind = 'final'",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

pub struct AssessmentStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl AssessmentStore {
    /// Open or create the database at `path`; the payload key is derived from `secret`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                session_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                ts INTEGER NOT NULL,
                payload_enc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_records_session ON records(session_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_records_final ON records(session_id) WHERE kind = 'final';
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: derive_key(secret),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| EngineError::Storage("connection lock poisoned".into()))
    }

    /// Append one record. Records are never updated; reusing an id is an
    /// error, and a session takes nothing after its final assessment.
    pub fn append(&self, record: &StageRecord) -> Result<()> {
        let payload = serde_json::to_vec(&record.payload)?;
        let enc = encrypt(&self.key, &payload)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if finalized(&tx, &record.session_id)? {
            return Err(EngineError::AlreadyFinalized(record.session_id.clone()));
        }
        tx.execute(
            "INSERT INTO records (id, session_id, kind, ts, payload_enc) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.session_id,
                record.payload.kind(),
                record.recorded_at.timestamp_millis(),
                enc
            ],
        )?;
        tx.commit()?;
        tracing::debug!(id = %record.id, session_id = %record.session_id, kind = %record.payload.kind(), "record appended");
        Ok(())
    }

    pub fn is_finalized(&self, session_id: &str) -> Result<bool> {
        finalized(&*self.conn()?, session_id)
    }

    /// Every record of a session in append order.
    pub fn records_for_session(&self, session_id: &str) -> Result<Vec<StageRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, ts, payload_enc FROM records WHERE session_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, ts, enc) = row?;
            let plain = decrypt(&self.key, &enc)?;
            let recorded_at = Utc
                .timestamp_millis_opt(ts)
                .single()
                .ok_or_else(|| EngineError::Storage(format!("record {id}: bad timestamp {ts}")))?;
            records.push(StageRecord {
                id,
                session_id: session_id.to_string(),
                recorded_at,
                payload: serde_json::from_slice(&plain)?,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::ModalityResult;
    use crate::features::Modality;
    use crate::session::RecordPayload;

    fn stage(modality: Modality, probability: f64) -> RecordPayload {
        RecordPayload::Stage(ModalityResult {
            modality,
            probability,
            confidence: 0.9,
            contributing_weights: Vec::new(),
            weighting: None,
        })
    }

    #[test]
    fn records_come_back_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssessmentStore::open(&dir.path().join("nested/records.db"), b"secret").unwrap();
        let first = StageRecord::new("s1", stage(Modality::Behavioral, 0.4));
        let second = StageRecord::new("s1", stage(Modality::Facial, 0.2));
        store.append(&first).unwrap();
        store.append(&StageRecord::new("s2", stage(Modality::Facial, 0.9))).unwrap();
        store.append(&second).unwrap();

        let got = store.records_for_session("s1").unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].id, first.id);
        assert_eq!(got[0].payload, first.payload);
        assert_eq!(got[1].id, second.id);
    }

    #[test]
    fn appended_records_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssessmentStore::open(&dir.path().join("records.db"), b"secret").unwrap();
        let record = StageRecord::new("s1", stage(Modality::Behavioral, 0.4));
        store.append(&record).unwrap();
        assert!(store.append(&record).is_err());
    }

    fn final_payload() -> RecordPayload {
        use crate::config::AggregationConfig;
        use crate::risk::RiskEngine;
        let stage = ModalityResult {
            modality: Modality::Behavioral,
            probability: 0.8,
            confidence: 0.9,
            contributing_weights: Vec::new(),
            weighting: None,
        };
        let assessment = RiskEngine::new(AggregationConfig::default())
            .unwrap()
            .aggregate(Some(&stage), None, None)
            .unwrap();
        RecordPayload::Final(assessment)
    }

    #[test]
    fn finalized_session_accepts_no_more_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssessmentStore::open(&dir.path().join("records.db"), b"secret").unwrap();
        store.append(&StageRecord::new("s1", stage(Modality::Behavioral, 0.8))).unwrap();
        assert!(!store.is_finalized("s1").unwrap());
        store.append(&StageRecord::new("s1", final_payload())).unwrap();
        assert!(store.is_finalized("s1").unwrap());

        for payload in [final_payload(), stage(Modality::Facial, 0.3)] {
            let err = store.append(&StageRecord::new("s1", payload)).unwrap_err();
            assert!(matches!(err, EngineError::AlreadyFinalized(ref id) if id == "s1"));
        }
        assert_eq!(store.records_for_session("s1").unwrap().len(), 2);
        // other sessions are unaffected
        store.append(&StageRecord::new("s2", final_payload())).unwrap();
    }

    #[test]
    fn schema_allows_one_final_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        AssessmentStore::open(&path, b"secret").unwrap();
        let conn = Connection::open(&path).unwrap();
        let insert = |id: &str| {
            conn.execute(
                "INSERT INTO records (id, session_id, kind, ts, payload_enc) VALUES (?1, 's1', 'final', 0, '')",
                params![id],
            )
        };
        insert("a").unwrap();
        assert!(insert("b").is_err());
    }

    #[test]
    fn payload_is_unreadable_with_another_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        AssessmentStore::open(&path, b"right")
            .unwrap()
            .append(&StageRecord::new("s1", stage(Modality::EyeTracking, 0.6)))
            .unwrap();
        let other = AssessmentStore::open(&path, b"wrong").unwrap();
        assert!(matches!(
            other.records_for_session("s1"),
            Err(EngineError::Storage(_))
        ));
    }

    #[test]
    fn payload_is_not_stored_in_the_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let store = AssessmentStore::open(&path, b"secret").unwrap();
        store
            .append(&StageRecord::new("s1", stage(Modality::Behavioral, 0.4)))
            .unwrap();
        let conn = Connection::open(&path).unwrap();
        let enc: String = conn
            .query_row("SELECT payload_enc FROM records", [], |r| r.get(0))
            .unwrap();
        assert!(!enc.contains("behavioral"));
    }
}
