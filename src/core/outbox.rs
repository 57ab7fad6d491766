//! The Mutation Outbox: an ordered, durable queue of pending mutations.
//!
//! Descriptors are append-only. They leave the queue only in bulk: either
//! everything up to a sequence number that a remote flush confirmed
//! (`remove_through`), or everything at once (`clear_all`).

use crate::core::error::PantryError;
use crate::core::pool::SqlitePool;
use crate::core::time;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Put,
    Delete,
    Clear,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Put => "put",
            MutationKind::Delete => "delete",
            MutationKind::Clear => "clear",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "put" => Ok(MutationKind::Put),
            "delete" => Ok(MutationKind::Delete),
            "clear" => Ok(MutationKind::Clear),
            other => Err(PantryError::Validation(format!(
                "unknown mutation kind '{}'",
                other
            ))),
        }
    }
}

/// One queued write. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationDescriptor {
    pub sequence: i64,
    pub kind: MutationKind,
    pub collection: String,
    pub payload: Value,
    pub enqueued_at: String,
}

pub struct Outbox {
    pool: Arc<SqlitePool>,
}

impl Outbox {
    /// The outbox shares the store's database; its table is created by the
    /// store's schema upgrade.
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Append a descriptor. The returned sequence is strictly greater than
    /// every sequence ever handed out by this queue.
    pub fn enqueue(
        &self,
        kind: MutationKind,
        collection: &str,
        payload: Value,
    ) -> Result<MutationDescriptor, PantryError> {
        let body = serde_json::to_string(&payload)?;
        let enqueued_at = time::now_epoch_z();
        let sequence = self.pool.with_write(|conn| {
            conn.execute(
                "INSERT INTO sync_queue(kind, collection, payload, enqueued_at) VALUES(?1, ?2, ?3, ?4)",
                params![kind.as_str(), collection, body, enqueued_at],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(sequence, kind = %kind, collection, "enqueued mutation");
        Ok(MutationDescriptor {
            sequence,
            kind,
            collection: collection.to_string(),
            payload,
            enqueued_at,
        })
    }

    /// Every pending descriptor in enqueue order. Non-destructive.
    pub fn drain_all(&self) -> Result<Vec<MutationDescriptor>, PantryError> {
        let rows = self.pool.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, kind, collection, payload, enqueued_at FROM sync_queue ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })?;

        rows.into_iter()
            .map(|(sequence, kind, collection, payload, enqueued_at)| {
                Ok(MutationDescriptor {
                    sequence,
                    kind: kind.parse()?,
                    collection,
                    payload: serde_json::from_str(&payload)?,
                    enqueued_at,
                })
            })
            .collect()
    }

    /// Remove descriptors with `sequence <= through`. Anything appended after
    /// the caller's snapshot has a higher sequence and stays queued.
    pub fn remove_through(&self, through: i64) -> Result<usize, PantryError> {
        let removed = self.pool.with_write_tx(|tx| {
            Ok(tx.execute("DELETE FROM sync_queue WHERE seq <= ?1", params![through])?)
        })?;
        debug!(through, removed, "removed flushed mutations");
        Ok(removed)
    }

    /// Remove every descriptor, including ones no flush has covered.
    pub fn clear_all(&self) -> Result<usize, PantryError> {
        let removed = self
            .pool
            .with_write_tx(|tx| Ok(tx.execute("DELETE FROM sync_queue", [])?))?;
        debug!(removed, "cleared sync queue");
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, PantryError> {
        let n: i64 = self.pool.with_read(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?)
        })?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool, PantryError> {
        Ok(self.len()? == 0)
    }
}
