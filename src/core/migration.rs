//! Schema versioning and in-place upgrades for `pantry.db`.
//!
//! - **Version tracking**: `PRAGMA user_version` holds the last applied schema version
//! - **Non-destructive**: migrations only add tables/columns; existing collections survive
//! - **Idempotent**: each step checks before it alters, so a re-run is harmless
//! - **Single writer**: the whole upgrade runs inside one IMMEDIATE transaction

use crate::core::error::PantryError;
use crate::core::pool::SqlitePool;
use crate::core::schemas;
use rusqlite::Connection;
use tracing::info;

/// Migration definition
pub struct Migration {
    /// Schema version this migration produces
    pub target_version: u32,
    /// Human-readable description
    pub description: &'static str,
    /// Migration function
    pub up: fn(&Connection) -> Result<(), PantryError>,
}

/// All migrations in chronological order
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            target_version: 1,
            description: "Create collection registry and record table",
            up: migrate_create_records,
        },
        Migration {
            target_version: 2,
            description: "Create sync queue",
            up: migrate_create_sync_queue,
        },
        Migration {
            target_version: 3,
            description: "Add updated_at column to records",
            up: migrate_add_record_updated_at,
        },
    ]
}

pub fn latest_version() -> u32 {
    all_migrations()
        .iter()
        .map(|m| m.target_version)
        .max()
        .unwrap_or(0)
}

pub fn schema_version(conn: &Connection) -> Result<u32, PantryError> {
    let v: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(v.max(0) as u32)
}

/// Bring the database up to the latest schema. Returns the number of
/// migrations applied.
pub fn check_and_migrate(pool: &SqlitePool) -> Result<usize, PantryError> {
    pool.with_write_tx(|tx| {
        let from = schema_version(tx)?;
        let latest = latest_version();
        if from > latest {
            return Err(PantryError::SchemaMismatch(format!(
                "store schema v{} is newer than supported v{}",
                from, latest
            )));
        }

        let mut applied = 0;
        for migration in all_migrations() {
            if migration.target_version > from {
                info!(
                    target_version = migration.target_version,
                    "applying migration: {}", migration.description
                );
                (migration.up)(tx)?;
                applied += 1;
            }
        }

        if applied > 0 {
            tx.pragma_update(None, "user_version", latest as i64)?;
        }
        Ok(applied)
    })
}

fn migrate_create_records(conn: &Connection) -> Result<(), PantryError> {
    conn.execute(schemas::COLLECTIONS_SCHEMA, [])?;
    conn.execute(schemas::RECORDS_SCHEMA, [])?;
    Ok(())
}

fn migrate_create_sync_queue(conn: &Connection) -> Result<(), PantryError> {
    conn.execute(schemas::SYNC_QUEUE_SCHEMA, [])?;
    Ok(())
}

fn migrate_add_record_updated_at(conn: &Connection) -> Result<(), PantryError> {
    let has_column: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('records') WHERE name='updated_at'",
        [],
        |row| row.get(0),
    )?;
    if has_column == 0 {
        conn.execute(schemas::RECORDS_UPDATED_AT_COLUMN, [])?;
    }
    Ok(())
}
