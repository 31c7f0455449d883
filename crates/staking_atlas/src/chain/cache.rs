//! SQLite store for raw API responses, keyed by a hash of the request.
//!
//! Baker lists go stale every poll, so reads can ask for a maximum age. Offline
//! runs ignore age and serve whatever was stored last.

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// One stored response with the time it was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: Vec<u8>,
    pub stored_utc: i64,
}

pub struct Cache {
    conn: Mutex<Connection>,
}

impl Cache {
    /// Open or create the cache database, creating parent dirs as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                key TEXT PRIMARY KEY,
                endpoint TEXT NOT NULL,
                body BLOB NOT NULL,
                stored_utc INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_responses_endpoint ON responses(endpoint);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Key for a request: SHA-256 over the endpoint and its normalized parameters.
    pub fn key_for(endpoint: &str, params: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update([0u8]);
        hasher.update(params.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }

    pub fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT body, stored_utc FROM responses WHERE key = ?1")?;
        let row = stmt
            .query_row([key], |r| {
                Ok(CachedResponse {
                    body: r.get(0)?,
                    stored_utc: r.get(1)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    /// Cached body if it was stored less than `max_age_secs` before `now`.
    pub fn get_fresh(
        &self,
        key: &str,
        max_age_secs: u64,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let Some(hit) = self.get(key)? else {
            return Ok(None);
        };
        let age = now.unix_timestamp().saturating_sub(hit.stored_utc);
        if age >= 0 && (age as u64) < max_age_secs {
            Ok(Some(hit.body))
        } else {
            Ok(None)
        }
    }

    pub fn put(
        &self,
        key: &str,
        endpoint: &str,
        body: &[u8],
        now: OffsetDateTime,
    ) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO responses (key, endpoint, body, stored_utc) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![key, endpoint, body, now.unix_timestamp()],
        )?;
        Ok(())
    }

    /// Drop every stored response for one endpoint (e.g. after a registry change).
    pub fn purge_endpoint(&self, endpoint: &str) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM responses WHERE endpoint = ?1", [endpoint])?)
    }
}
