use pantrysync::core::collection::{CollectionRegistry, Record};
use pantrysync::core::facade::SyncContext;
use pantrysync::core::flusher::FlushOutcome;
use pantrysync::core::outbox::{MutationDescriptor, MutationKind};
use pantrysync::core::remote::{InMemoryRemote, RemoteAck, RemoteEndpoint, RemoteError, RemoteMode};
use pantrysync::core::scheduler::{DeferredScheduler, ImmediateScheduler};
use pantrysync::core::schemas::GROCERIES;
use pantrysync::core::status::{SyncEvent, SyncStatus};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

fn rec(value: serde_json::Value) -> Record {
    value.as_object().cloned().expect("object literal")
}

/// Context with a controllable remote and a scheduler that only runs when
/// the test says so.
fn offline_first(root: &Path) -> (SyncContext, Arc<InMemoryRemote>, Arc<DeferredScheduler>) {
    let remote = Arc::new(InMemoryRemote::new(CollectionRegistry::standard()));
    let scheduler = Arc::new(DeferredScheduler::new());
    let ctx = SyncContext::open(
        root,
        CollectionRegistry::standard(),
        remote.clone(),
        scheduler.clone(),
    )
    .unwrap();
    (ctx, remote, scheduler)
}

fn kinds(batch: &[MutationDescriptor]) -> Vec<MutationKind> {
    batch.iter().map(|d| d.kind).collect()
}

#[test]
fn offline_put_is_pending_until_a_flush_succeeds() {
    let tmp = TempDir::new().unwrap();
    let (ctx, remote, scheduler) = offline_first(tmp.path());
    remote.set_mode(RemoteMode::Offline);

    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Milk"})))
        .unwrap();
    assert_eq!(ctx.status(), SyncStatus::Pending);
    assert!(scheduler.has_pending());

    // The scheduled attempt fails while offline.
    assert!(scheduler.resume());
    assert_eq!(ctx.status(), SyncStatus::Pending);
    assert_eq!(ctx.pending_mutations().unwrap().len(), 1);

    remote.set_mode(RemoteMode::Online);
    assert_eq!(
        ctx.flush_now(),
        FlushOutcome::Delivered {
            delivered: 1,
            remaining: 0
        }
    );
    assert!(ctx.pending_mutations().unwrap().is_empty());
    assert_eq!(ctx.status(), SyncStatus::Synced);
    assert_eq!(remote.collection(GROCERIES)["1"]["name"], "Milk");
}

#[test]
fn put_then_delete_replays_in_order_and_converges() {
    let tmp = TempDir::new().unwrap();
    let (ctx, remote, _scheduler) = offline_first(tmp.path());

    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Milk"})))
        .unwrap();
    ctx.delete_record(GROCERIES, "1").unwrap();
    ctx.flush_now();

    let received = remote.received();
    assert_eq!(received.len(), 1);
    assert_eq!(kinds(&received[0]), vec![MutationKind::Put, MutationKind::Delete]);
    assert!(remote.collection(GROCERIES).is_empty());
    assert!(ctx.get_record(GROCERIES, "1").unwrap().is_none());
}

#[test]
fn timeout_reverts_to_pending_and_keeps_descriptors() {
    let tmp = TempDir::new().unwrap();
    let (ctx, remote, _scheduler) = offline_first(tmp.path());
    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Milk"})))
        .unwrap();
    ctx.put_record(GROCERIES, rec(json!({"id": "2", "name": "Bread"})))
        .unwrap();
    let before = ctx.pending_mutations().unwrap();

    remote.set_mode(RemoteMode::TimingOut);
    let events = ctx.subscribe();
    let outcome = ctx.flush_now();
    assert!(matches!(outcome, FlushOutcome::Failed { .. }), "{outcome:?}");

    assert_eq!(ctx.status(), SyncStatus::Pending);
    assert_eq!(ctx.pending_mutations().unwrap(), before);

    let seen: Vec<SyncEvent> = events.try_iter().collect();
    assert_eq!(
        seen[0],
        SyncEvent::StatusChanged {
            from: SyncStatus::Pending,
            to: SyncStatus::Syncing
        }
    );
    assert_eq!(
        seen[1],
        SyncEvent::StatusChanged {
            from: SyncStatus::Syncing,
            to: SyncStatus::Pending
        }
    );
    assert!(matches!(seen[2], SyncEvent::SyncFailed { .. }));
}

#[test]
fn rejected_batch_drops_nothing() {
    let tmp = TempDir::new().unwrap();
    let (ctx, remote, _scheduler) = offline_first(tmp.path());
    for i in 0..3 {
        ctx.put_record(GROCERIES, rec(json!({"id": i.to_string(), "name": "x"})))
            .unwrap();
    }
    let before = ctx.pending_mutations().unwrap();

    remote.set_mode(RemoteMode::Rejecting);
    ctx.flush_now();
    remote.set_mode(RemoteMode::Offline);
    ctx.flush_now();

    let after = ctx.pending_mutations().unwrap();
    assert!(before.iter().all(|d| after.contains(d)));
    assert!(remote.received().is_empty());
}

#[test]
fn fifo_holds_across_flushes() {
    let tmp = TempDir::new().unwrap();
    let (ctx, remote, _scheduler) = offline_first(tmp.path());

    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Milk"})))
        .unwrap();
    remote.set_mode(RemoteMode::Offline);
    ctx.flush_now();
    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Oat milk"})))
        .unwrap();
    remote.set_mode(RemoteMode::Online);
    ctx.flush_now();

    let received = remote.received();
    assert_eq!(received.len(), 1);
    let names: Vec<_> = received[0]
        .iter()
        .map(|d| d.payload["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Milk", "Oat milk"]);
    assert_eq!(remote.collection(GROCERIES)["1"]["name"], "Oat milk");
}

#[test]
fn replaying_a_delivered_batch_is_harmless() {
    let tmp = TempDir::new().unwrap();
    let (ctx, remote, _scheduler) = offline_first(tmp.path());
    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Milk"})))
        .unwrap();
    ctx.put_record(GROCERIES, rec(json!({"id": "2", "name": "Eggs"})))
        .unwrap();
    ctx.delete_record(GROCERIES, "2").unwrap();
    let batch = ctx.pending_mutations().unwrap();

    remote.apply(&batch).unwrap();
    let once = remote.snapshot();
    remote.apply(&batch).unwrap();
    assert_eq!(remote.snapshot(), once);
}

#[test]
fn empty_queue_flush_is_idle() {
    let tmp = TempDir::new().unwrap();
    let (ctx, remote, _scheduler) = offline_first(tmp.path());
    assert_eq!(ctx.flush_now(), FlushOutcome::Idle);
    assert_eq!(ctx.status(), SyncStatus::Synced);
    assert!(remote.received().is_empty());
}

#[test]
fn immediate_scheduler_flushes_every_change() {
    let tmp = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new(CollectionRegistry::standard()));
    let ctx = SyncContext::open(
        tmp.path(),
        CollectionRegistry::standard(),
        remote.clone(),
        Arc::new(ImmediateScheduler),
    )
    .unwrap();

    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Milk"})))
        .unwrap();
    ctx.put_record(GROCERIES, rec(json!({"id": "2", "name": "Eggs"})))
        .unwrap();

    assert_eq!(remote.received().len(), 2);
    assert_eq!(ctx.status(), SyncStatus::Synced);
    assert!(ctx.pending_mutations().unwrap().is_empty());
}

#[test]
fn discarding_the_queue_settles_back_to_synced() {
    let tmp = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new(CollectionRegistry::standard()));
    remote.set_mode(RemoteMode::Offline);
    let ctx = SyncContext::open(
        tmp.path(),
        CollectionRegistry::standard(),
        remote.clone(),
        Arc::new(ImmediateScheduler),
    )
    .unwrap();
    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Milk"})))
        .unwrap();
    assert_eq!(ctx.status(), SyncStatus::Pending);

    assert_eq!(ctx.discard_pending().unwrap(), 1);
    assert_eq!(ctx.status(), SyncStatus::Synced);
    // The local record is untouched.
    assert!(ctx.get_record(GROCERIES, "1").unwrap().is_some());
}

/// Accepts batches like the in-memory remote, but performs one more local
/// change through the context while the first request is in flight.
struct ChangeDuringSend {
    inner: InMemoryRemote,
    ctx: OnceLock<Arc<SyncContext>>,
    fired: AtomicBool,
}

impl RemoteEndpoint for ChangeDuringSend {
    fn send_batch(&self, batch: &[MutationDescriptor]) -> Result<RemoteAck, RemoteError> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            if let Some(ctx) = self.ctx.get() {
                ctx.put_record(GROCERIES, rec(json!({"id": "late", "name": "Butter"})))
                    .map_err(|e| RemoteError::Protocol(e.to_string()))?;
            }
        }
        self.inner.send_batch(batch)
    }

    fn describe(&self) -> String {
        "change-during-send".to_string()
    }
}

#[test]
fn change_made_during_a_flush_survives_it() {
    let tmp = TempDir::new().unwrap();
    let remote = Arc::new(ChangeDuringSend {
        inner: InMemoryRemote::new(CollectionRegistry::standard()),
        ctx: OnceLock::new(),
        fired: AtomicBool::new(false),
    });
    let ctx = Arc::new(
        SyncContext::open(
            tmp.path(),
            CollectionRegistry::standard(),
            remote.clone(),
            Arc::new(DeferredScheduler::new()),
        )
        .unwrap(),
    );
    let _ = remote.ctx.set(Arc::clone(&ctx));

    ctx.put_record(GROCERIES, rec(json!({"id": "1", "name": "Milk"})))
        .unwrap();
    assert_eq!(
        ctx.flush_now(),
        FlushOutcome::Delivered {
            delivered: 1,
            remaining: 1
        }
    );
    assert_eq!(ctx.status(), SyncStatus::Pending);
    let left = ctx.pending_mutations().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].payload["id"], "late");

    assert_eq!(
        ctx.flush_now(),
        FlushOutcome::Delivered {
            delivered: 1,
            remaining: 0
        }
    );
    assert_eq!(ctx.status(), SyncStatus::Synced);
    assert_eq!(remote.inner.collection(GROCERIES).len(), 2);
}
