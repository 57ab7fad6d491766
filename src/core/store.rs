//! The Record Store: durable collections of schema-free records.
//!
//! Records live in a single `records` table keyed by `(collection, record_key)`.
//! Every write is an autocommit (or a single transaction for `clear`) on a
//! connection opened with `synchronous=FULL`, so a returned `Ok` means the
//! change is on disk.

use crate::core::collection::{CollectionRegistry, CollectionSpec, Record};
use crate::core::db;
use crate::core::error::PantryError;
use crate::core::migration;
use crate::core::pool::SqlitePool;
use crate::core::time;
use rusqlite::{OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct RecordStore {
    root: PathBuf,
    pool: Arc<SqlitePool>,
    registry: CollectionRegistry,
}

impl RecordStore {
    /// Open (or create and upgrade) the store under `root`, declaring every
    /// collection in `registry` that is not yet present.
    ///
    /// Safe to call repeatedly. Collections already on disk are kept even if
    /// the registry no longer names them.
    pub fn open(root: &Path, mut registry: CollectionRegistry) -> Result<Self, PantryError> {
        db::storage_preflight(root)?;
        let pool = Arc::new(SqlitePool::new(&db::store_db_path(root)));
        migration::check_and_migrate(&pool).map_err(|e| match e {
            PantryError::Storage(err) => {
                PantryError::StorageUnavailable(format!("cannot open store: {}", err))
            }
            other => other,
        })?;

        let on_disk = pool.with_write_tx(|tx| {
            for spec in registry.specs() {
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT key_field FROM collections WHERE name = ?1",
                        params![spec.name],
                        |row| row.get(0),
                    )
                    .optional()?;
                match existing {
                    Some(key_field) if key_field != spec.key_field => {
                        return Err(PantryError::SchemaMismatch(format!(
                            "collection '{}' is stored with key field '{}', not '{}'",
                            spec.name, key_field, spec.key_field
                        )));
                    }
                    Some(_) => {}
                    None => {
                        tx.execute(
                            "INSERT INTO collections(name, key_field) VALUES(?1, ?2)",
                            params![spec.name, spec.key_field],
                        )?;
                        debug!(collection = %spec.name, "declared collection");
                    }
                }
            }
            let mut stmt = tx.prepare("SELECT name, key_field FROM collections")?;
            let rows = stmt.query_map([], |row| {
                Ok(CollectionSpec {
                    name: row.get(0)?,
                    key_field: row.get(1)?,
                })
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })?;

        for spec in on_disk {
            registry.declare(spec)?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            pool,
            registry,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn pool(&self) -> Arc<SqlitePool> {
        Arc::clone(&self.pool)
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    pub fn spec(&self, collection: &str) -> Result<&CollectionSpec, PantryError> {
        self.registry.get(collection)
    }

    pub fn collections(&self) -> Vec<&CollectionSpec> {
        self.registry.specs()
    }

    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Record>, PantryError> {
        self.spec(collection)?;
        let body: Option<String> = self.pool.with_read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT body FROM records WHERE collection = ?1 AND record_key = ?2",
                    params![collection, key],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        body.map(|b| decode(&b)).transpose()
    }

    /// Every record in the collection, in no particular order.
    pub fn get_all(&self, collection: &str) -> Result<Vec<Record>, PantryError> {
        self.spec(collection)?;
        let bodies = self.pool.with_read(|conn| {
            let mut stmt = conn.prepare("SELECT body FROM records WHERE collection = ?1")?;
            let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })?;
        bodies.iter().map(|b| decode(b)).collect()
    }

    /// Upsert by key field. An existing record with the same key is replaced
    /// in full. Returns the key.
    pub fn put(&self, collection: &str, record: &Record) -> Result<String, PantryError> {
        let key = self.spec(collection)?.extract_key(record)?;
        let body = serde_json::to_string(record)?;
        let now = time::now_epoch_z();
        self.pool.with_write(|conn| {
            conn.execute(
                "INSERT INTO records(collection, record_key, body, updated_at) VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, record_key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![collection, key, body, now],
            )?;
            Ok(())
        })?;
        debug!(collection, key = %key, "put record");
        Ok(key)
    }

    /// Remove a record. Returns whether one was present; absence is not an error.
    pub fn delete(&self, collection: &str, key: &str) -> Result<bool, PantryError> {
        self.spec(collection)?;
        let removed = self.pool.with_write(|conn| {
            Ok(conn.execute(
                "DELETE FROM records WHERE collection = ?1 AND record_key = ?2",
                params![collection, key],
            )?)
        })?;
        debug!(collection, key, removed, "delete record");
        Ok(removed > 0)
    }

    /// Remove every record in the collection in one transaction. Returns the
    /// number removed.
    pub fn clear(&self, collection: &str) -> Result<usize, PantryError> {
        self.spec(collection)?;
        let removed = self.pool.with_write_tx(|tx| {
            Ok(tx.execute(
                "DELETE FROM records WHERE collection = ?1",
                params![collection],
            )?)
        })?;
        debug!(collection, removed, "cleared collection");
        Ok(removed)
    }

    pub fn count(&self, collection: &str) -> Result<usize, PantryError> {
        self.spec(collection)?;
        let n: i64 = self.pool.with_read(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM records WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?)
        })?;
        Ok(n as usize)
    }
}

fn decode(body: &str) -> Result<Record, PantryError> {
    Ok(serde_json::from_str(body)?)
}
