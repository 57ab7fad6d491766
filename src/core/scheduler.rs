//! Deferred-run capability standing in for a platform background-sync API.

use std::sync::Mutex;
use tracing::debug;

pub type DeferredJob = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Ask for `job` to run once the host allows it. Never fails the caller:
    /// a scheduler that cannot honor the request drops it, and the next
    /// trigger retries.
    fn request_deferred_run(&self, job: DeferredJob);
}

/// Runs every job on the spot. For hosts that are always online.
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn request_deferred_run(&self, job: DeferredJob) {
        job();
    }
}

/// Holds the latest job until the host regains foreground or connectivity.
///
/// Requests coalesce: a flush reads the whole outbox, so only the most
/// recent job is kept.
#[derive(Default)]
pub struct DeferredScheduler {
    pending: Mutex<Option<DeferredJob>>,
}

impl DeferredScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|p| p.is_some())
            .unwrap_or(false)
    }

    /// Run the held job, if any. Returns whether one ran.
    pub fn resume(&self) -> bool {
        let job = match self.pending.lock() {
            Ok(mut p) => p.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match job {
            Some(job) => {
                debug!("running deferred job");
                job();
                true
            }
            None => false,
        }
    }
}

impl Scheduler for DeferredScheduler {
    fn request_deferred_run(&self, job: DeferredJob) {
        match self.pending.lock() {
            Ok(mut p) => *p = Some(job),
            Err(poisoned) => *poisoned.into_inner() = Some(job),
        }
    }
}
