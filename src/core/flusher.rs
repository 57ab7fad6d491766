//! Sync Flusher: delivers the outbox to the remote endpoint.
//!
//! A flush snapshots the queue, sends it in one request, and on success
//! removes exactly the snapshot (by sequence). Failures leave the queue
//! untouched and re-arm `pending`; there is no internal retry loop, the next
//! trigger is the retry.

use crate::core::error::PantryError;
use crate::core::outbox::Outbox;
use crate::core::remote::{AckStatus, RemoteEndpoint, RemoteError};
use crate::core::status::{SyncEvent, SyncStatus, SyncStatusCoordinator};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Nothing was queued.
    Idle,
    /// Another flush in this process owns the queue right now.
    AlreadyRunning,
    /// The remote confirmed `delivered` descriptors; `remaining` arrived
    /// while the request was in flight.
    Delivered { delivered: usize, remaining: usize },
    /// The queue was kept as-is.
    Failed { reason: String },
}

pub struct SyncFlusher {
    outbox: Arc<Outbox>,
    status: Arc<SyncStatusCoordinator>,
    remote: Arc<dyn RemoteEndpoint>,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncFlusher {
    pub fn new(
        outbox: Arc<Outbox>,
        status: Arc<SyncStatusCoordinator>,
        remote: Arc<dyn RemoteEndpoint>,
    ) -> Self {
        Self {
            outbox,
            status,
            remote,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn remote(&self) -> &dyn RemoteEndpoint {
        self.remote.as_ref()
    }

    /// Run one flush attempt. Never returns a hard error for remote or
    /// storage trouble; those come back as [`FlushOutcome::Failed`].
    pub fn flush(&self) -> FlushOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return FlushOutcome::AlreadyRunning;
        }
        let _guard = InFlight(&self.in_flight);

        let batch = match self.outbox.drain_all() {
            Ok(batch) => batch,
            Err(e) => return self.fail(PantryError::FlushFailed(e.to_string()), false),
        };
        let Some(last) = batch.last().map(|d| d.sequence) else {
            // A discarded queue can leave `pending` behind with nothing to send.
            if self.status.status() == SyncStatus::Pending {
                let settled = self
                    .status
                    .begin_flush()
                    .and_then(|_| self.status.finish_flush(true, 0));
                if let Err(e) = settled {
                    warn!(error = %e, "could not settle sync status");
                }
            }
            return FlushOutcome::Idle;
        };

        if let Err(e) = self.status.begin_flush() {
            return self.fail(e, false);
        }
        info!(
            operations = batch.len(),
            remote = %self.remote.describe(),
            "flushing sync queue"
        );

        let sent = self.remote.send_batch(&batch).and_then(|ack| match ack.status {
            AckStatus::Success => Ok(()),
            AckStatus::Failure => Err(RemoteError::Rejected),
        });
        if let Err(e) = sent {
            return self.fail(PantryError::FlushFailed(e.to_string()), true);
        }

        if let Err(e) = self.outbox.remove_through(last) {
            // Delivered but still queued: the next flush resends, which the
            // remote absorbs idempotently.
            return self.fail(PantryError::FlushFailed(e.to_string()), true);
        }

        let remaining = self.outbox.len().unwrap_or(1);
        if let Err(e) = self.status.finish_flush(true, remaining) {
            warn!(error = %e, "could not settle sync status");
        }
        info!(delivered = batch.len(), remaining, "sync complete");
        self.status.notify(SyncEvent::SyncComplete {
            delivered: batch.len(),
        });
        FlushOutcome::Delivered {
            delivered: batch.len(),
            remaining,
        }
    }

    fn fail(&self, err: PantryError, started: bool) -> FlushOutcome {
        let reason = match &err {
            PantryError::FlushFailed(r) => r.clone(),
            other => other.to_string(),
        };
        if started {
            if let Err(e) = self.status.finish_flush(false, 0) {
                warn!(error = %e, "could not settle sync status");
            }
        }
        warn!(reason = %reason, "sync failed, will retry on next trigger");
        self.status.notify(SyncEvent::SyncFailed {
            reason: reason.clone(),
        });
        FlushOutcome::Failed { reason }
    }
}
