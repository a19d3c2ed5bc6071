//! Durable document saves.

/// SQLite snapshot sink.
pub mod sqlite;

use crate::document::memory::DocumentSnapshot;

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// SQLite failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Snapshot (de)serialization failure.
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything else.
    #[error("{0}")]
    Message(String),
}

/// Result alias for persistence calls.
pub type PersistResult<T> = Result<T, PersistError>;

/// Durable destination for document saves.
pub trait DocumentSink: Send {
    /// Stores `snapshot` and returns its sequence number.
    fn save(&mut self, snapshot: &DocumentSnapshot) -> PersistResult<u64>;

    /// Latest stored snapshot, if any.
    fn load_latest(&self) -> PersistResult<Option<DocumentSnapshot>>;

    /// Drops all but the newest `keep` snapshots.
    fn compact(&mut self, _keep: usize) -> PersistResult<usize> {
        Ok(0)
    }
}
