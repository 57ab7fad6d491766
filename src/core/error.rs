use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PantryError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("SQLite error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
    #[error("Invalid record for '{collection}': {reason}")]
    InvalidRecord { collection: String, reason: String },
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid sync status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    /// The local write for a domain mutation did not land. Nothing was queued.
    #[error("Failed to persist change to '{collection}': {source}")]
    PersistenceFailed {
        collection: String,
        #[source]
        source: Box<PantryError>,
    },
    /// The local write landed but the outbox append failed; the change will
    /// not reach the remote until it is repeated.
    #[error("Saved locally, but failed to queue '{collection}' change for sync: {source}")]
    SyncQueueingFailed {
        collection: String,
        #[source]
        source: Box<PantryError>,
    },
    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl PantryError {
    pub fn persistence_failed(collection: &str, source: PantryError) -> Self {
        PantryError::PersistenceFailed {
            collection: collection.to_string(),
            source: Box::new(source),
        }
    }

    pub fn sync_queueing_failed(collection: &str, source: PantryError) -> Self {
        PantryError::SyncQueueingFailed {
            collection: collection.to_string(),
            source: Box::new(source),
        }
    }

    /// True when the local record change was applied despite the error.
    pub fn local_change_applied(&self) -> bool {
        matches!(self, PantryError::SyncQueueingFailed { .. })
    }
}
