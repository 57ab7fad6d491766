//! SQLite access with read/write separation.
//!
//! - Writes are serialized through a single mutex per database and run on a
//!   fresh connection.
//! - Reads open a fresh connection without taking the mutex (WAL lets them run
//!   alongside a writer).
//!
//! Connections are not cached so that a second process (the CLI invoked again
//! while a flush is running) never fights over WAL/SHM handles.

use crate::core::db;
use crate::core::error::PantryError;
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Write connection busy_timeout in seconds.
const WRITE_BUSY_TIMEOUT_SECS: u32 = 5;
/// Read connection busy_timeout in seconds.
const READ_BUSY_TIMEOUT_SECS: u32 = 5;

pub struct SqlitePool {
    db_path: PathBuf,
    write_lock: Mutex<()>,
}

impl SqlitePool {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a closure with a write connection. Write access is serialized.
    pub fn with_write<F, R>(&self, f: F) -> Result<R, PantryError>
    where
        F: FnOnce(&Connection) -> Result<R, PantryError>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PantryError::Validation("pool write lock poisoned".to_string()))?;
        let conn = db::db_connect(&self.db_path, WRITE_BUSY_TIMEOUT_SECS)?;
        f(&conn)
    }

    /// Execute a closure inside an IMMEDIATE transaction on the write
    /// connection. The transaction commits only if the closure succeeds.
    pub fn with_write_tx<F, R>(&self, f: F) -> Result<R, PantryError>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<R, PantryError>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PantryError::Validation("pool write lock poisoned".to_string()))?;
        let mut conn = db::db_connect(&self.db_path, WRITE_BUSY_TIMEOUT_SECS)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Execute a closure with a read connection (no mutex serialization).
    pub fn with_read<F, R>(&self, f: F) -> Result<R, PantryError>
    where
        F: FnOnce(&Connection) -> Result<R, PantryError>,
    {
        let conn = db::db_connect(&self.db_path, READ_BUSY_TIMEOUT_SECS)?;
        f(&conn)
    }
}
