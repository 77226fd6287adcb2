//! SQLite-backed scan history with AES-GCM encryption of the detail column.
//! Key derived from a device-bound secret supplied by the caller.

use crate::error::StoreError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

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
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    if raw.len() < NONCE_LEN {
        return Err(StoreError::Decode("payload too short".to_string()));
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| StoreError::Crypto)?;
    cipher.decrypt(nonce.into(), ct).map_err(|_| StoreError::Crypto)
}

/// One persisted scan. `detail` is the JSON kept encrypted at rest
/// (reasons and component scores).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub ts: i64,
    pub filename: String,
    pub verdict: String,
    pub probability: f64,
    pub risk_band: String,
    pub source_type: String,
    pub detail: serde_json::Value,
}

pub struct ScanStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl ScanStore {
    /// Open or create DB at path. Key is derived from `secret`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn, secret)
    }

    pub fn open_in_memory(secret: &[u8]) -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, secret)
    }

    fn init(conn: Connection, secret: &[u8]) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scans (
                id TEXT PRIMARY KEY,
                ts INTEGER NOT NULL,
                filename TEXT NOT NULL,
                verdict TEXT NOT NULL,
                probability REAL NOT NULL,
                risk_band TEXT NOT NULL,
                source_type TEXT NOT NULL,
                detail_enc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_scans_ts ON scans(ts);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: derive_key(secret),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Insert a scan (detail stored encrypted)
    pub fn insert_scan(&self, record: &ScanRecord) -> Result<(), StoreError> {
        let detail = serde_json::to_vec(&record.detail)?;
        let enc = encrypt(&self.key, &detail)?;
        self.lock().execute(
            "INSERT OR REPLACE INTO scans (id, ts, filename, verdict, probability, risk_band, source_type, detail_enc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.ts,
                record.filename,
                record.verdict,
                record.probability,
                record.risk_band,
                record.source_type,
                enc
            ],
        )?;
        Ok(())
    }

    /// Read scan by id (decrypt detail)
    pub fn get(&self, id: &str) -> Result<Option<ScanRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, ts, filename, verdict, probability, risk_band, source_type, detail_enc
             FROM scans WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(self.decode_row(row)?)),
            None => Ok(None),
        }
    }

    /// Most recent scans, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, ts, filename, verdict, probability, risk_band, source_type, detail_enc
             FROM scans ORDER BY ts DESC LIMIT ?1",
        )?;
        let mut rows = stmt.query(params![limit as i64])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(self.decode_row(row)?);
        }
        Ok(out)
    }

    /// Retention: delete scans older than given timestamp
    pub fn prune_before(&self, ts: i64) -> Result<u64, StoreError> {
        let n = self
            .lock()
            .execute("DELETE FROM scans WHERE ts < ?1", params![ts])?;
        Ok(n as u64)
    }

    fn decode_row(&self, row: &Row<'_>) -> Result<ScanRecord, StoreError> {
        let enc: String = row.get(7)?;
        let plain = decrypt(&self.key, &enc)?;
        Ok(ScanRecord {
            id: row.get(0)?,
            ts: row.get(1)?,
            filename: row.get(2)?,
            verdict: row.get(3)?,
            probability: row.get(4)?,
            risk_band: row.get(5)?,
            source_type: row.get(6)?,
            detail: serde_json::from_slice(&plain)?,
        })
    }
}
