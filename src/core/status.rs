//! Sync Status Coordinator.
//!
//! A process-wide three-state machine observed by the host:
//!
//! ```text
//! synced --enqueue--> pending --flush start--> syncing --ok--> synced
//!                        ^                        |
//!                        +-------- failure -------+
//! ```
//!
//! State is not persisted. At boot it is `synced` and must be reconciled
//! against the outbox before anything else runs.

use crate::core::error::PantryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Pending,
    Syncing,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
        }
    }

    pub fn can_transition_to(self, to: SyncStatus) -> bool {
        matches!(
            (self, to),
            (SyncStatus::Synced, SyncStatus::Pending)
                | (SyncStatus::Pending, SyncStatus::Syncing)
                | (SyncStatus::Syncing, SyncStatus::Synced)
                | (SyncStatus::Syncing, SyncStatus::Pending)
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    StatusChanged { from: SyncStatus, to: SyncStatus },
    SyncComplete { delivered: usize },
    SyncFailed { reason: String },
}

struct Inner {
    status: SyncStatus,
    /// A mutation was queued while `syncing`.
    dirty: bool,
    subscribers: Vec<Sender<SyncEvent>>,
}

pub struct SyncStatusCoordinator {
    inner: Mutex<Inner>,
}

impl Default for SyncStatusCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatusCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: SyncStatus::Synced,
                dirty: false,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Updates are single assignments; a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> SyncStatus {
        self.lock().status
    }

    /// Receive every event emitted from now on. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> Receiver<SyncEvent> {
        let (tx, rx) = mpsc::channel();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Move to `to` if the edge is legal.
    pub fn transition(&self, to: SyncStatus) -> Result<(), PantryError> {
        move_to(&mut self.lock(), to)
    }

    /// A mutation was queued. While a flush is in flight the status stays
    /// `syncing` but the flush can no longer settle on `synced`.
    pub fn mark_pending(&self) {
        let mut inner = self.lock();
        match inner.status {
            SyncStatus::Synced => {
                let _ = move_to(&mut inner, SyncStatus::Pending);
            }
            SyncStatus::Syncing => inner.dirty = true,
            SyncStatus::Pending => {}
        }
    }

    /// Enter `syncing`. From `synced` this walks through `pending` first.
    pub fn begin_flush(&self) -> Result<(), PantryError> {
        let mut inner = self.lock();
        if inner.status == SyncStatus::Synced {
            move_to(&mut inner, SyncStatus::Pending)?;
        }
        move_to(&mut inner, SyncStatus::Syncing)?;
        inner.dirty = false;
        Ok(())
    }

    /// Leave `syncing`. Success with nothing left queued, and nothing marked
    /// pending since the flush began, settles on `synced`; anything else
    /// re-arms `pending`.
    pub fn finish_flush(&self, success: bool, remaining: usize) -> Result<(), PantryError> {
        let mut inner = self.lock();
        let dirty = std::mem::take(&mut inner.dirty);
        if success && remaining == 0 && !dirty {
            move_to(&mut inner, SyncStatus::Synced)
        } else {
            move_to(&mut inner, SyncStatus::Pending)
        }
    }

    /// Boot-time reconciliation with the outbox length.
    pub fn reconcile(&self, outbox_len: usize) {
        if outbox_len > 0 {
            self.mark_pending();
        }
    }

    pub fn notify(&self, event: SyncEvent) {
        let mut inner = self.lock();
        broadcast(&mut inner, event);
    }
}

fn move_to(inner: &mut Inner, to: SyncStatus) -> Result<(), PantryError> {
    let from = inner.status;
    if !from.can_transition_to(to) {
        return Err(PantryError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    inner.status = to;
    debug!(%from, %to, "sync status changed");
    broadcast(inner, SyncEvent::StatusChanged { from, to });
    Ok(())
}

fn broadcast(inner: &mut Inner, event: SyncEvent) {
    inner
        .subscribers
        .retain(|tx| tx.send(event.clone()).is_ok());
}
