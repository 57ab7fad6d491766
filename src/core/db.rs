use crate::core::error::PantryError;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Open a connection with the pragmas every store connection needs.
///
/// `synchronous=FULL` makes a committed write durable before the call returns.
pub fn db_connect(db_path: &Path, busy_timeout_secs: u32) -> Result<Connection, PantryError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(busy_timeout_secs as u64))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute_batch("PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn store_db_path(root: &Path) -> PathBuf {
    root.join(schemas::STORE_DB_NAME)
}

/// Confirm the data directory exists (or can be created) and accepts writes.
///
/// Any failure here means the host has no usable persistence backend.
pub fn storage_preflight(root: &Path) -> Result<(), PantryError> {
    fs::create_dir_all(root).map_err(|e| {
        PantryError::StorageUnavailable(format!(
            "cannot create data directory {}: {}",
            root.display(),
            e
        ))
    })?;

    let probe = root.join(format!(".preflight-{}", std::process::id()));
    fs::write(&probe, b"ok").map_err(|e| {
        PantryError::StorageUnavailable(format!(
            "data directory {} is not writable: {}",
            root.display(),
            e
        ))
    })?;
    let _ = fs::remove_file(&probe);
    Ok(())
}
