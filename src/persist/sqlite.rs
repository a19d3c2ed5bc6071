//! SQLite-backed snapshot sink for document saves.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::document::memory::DocumentSnapshot;

use super::{DocumentSink, PersistError, PersistResult};

const SNAPSHOT_FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u16,
    snapshot: DocumentSnapshot,
}

/// SQLite implementation of [`crate::persist::DocumentSink`].
pub struct SqliteDocumentSink {
    conn: Connection,
    retain: Option<usize>,
}

impl SqliteDocumentSink {
    /// Opens or creates a SQLite-backed sink at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite sink.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn, retain: None })
    }

    /// Keeps only the newest `keep` snapshots after every save.
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.retain = Some(keep.max(1));
        self
    }

    /// Number of stored snapshots.
    pub fn snapshot_count(&self) -> PersistResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl DocumentSink for SqliteDocumentSink {
    fn save(&mut self, snapshot: &DocumentSnapshot) -> PersistResult<u64> {
        let env = SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot: snapshot.clone(),
        };
        let payload = serde_json::to_vec(&env)?;
        self.conn.execute(
            "INSERT INTO snapshots(url, revision, ts_ms, payload) VALUES (?1, ?2, ?3, ?4)",
            params![snapshot.url, snapshot.revision as i64, now_ms() as i64, payload],
        )?;
        let seq = self.conn.last_insert_rowid() as u64;

        if let Some(keep) = self.retain {
            self.compact(keep)?;
        }
        Ok(seq)
    }

    fn load_latest(&self) -> PersistResult<Option<DocumentSnapshot>> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let env: SnapshotEnvelope = serde_json::from_slice(&payload)?;
        if env.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistError::Message(format!(
                "unsupported snapshot format: {}",
                env.format_version
            )));
        }
        Ok(Some(env.snapshot))
    }

    fn compact(&mut self, keep: usize) -> PersistResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM snapshots WHERE id NOT IN (SELECT id FROM snapshots ORDER BY id DESC LIMIT ?1)",
            params![keep as i64],
        )?;
        Ok(removed)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
