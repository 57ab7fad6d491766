//! The Domain Facade: the only write path into the store and the outbox.
//!
//! Every mutation runs the same sequence:
//!
//! 1. compute the record (shallow merge for updates, replace for adds)
//! 2. write it to the [`RecordStore`]; on failure stop with `PersistenceFailed`
//! 3. append a mirroring descriptor to the [`Outbox`]; on failure report
//!    `SyncQueueingFailed` (the local change stays)
//! 4. mark the status `pending` and ask the [`Scheduler`] for a flush
//!
//! The host (CLI, UI, AI layer) never touches the store or outbox directly.

use crate::core::collection::{CollectionRegistry, Record};
use crate::core::error::PantryError;
use crate::core::flusher::{FlushOutcome, SyncFlusher};
use crate::core::outbox::{MutationDescriptor, MutationKind, Outbox};
use crate::core::remote::RemoteEndpoint;
use crate::core::scheduler::Scheduler;
use crate::core::status::{SyncEvent, SyncStatus, SyncStatusCoordinator};
use crate::core::store::RecordStore;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

/// Result of a facade mutation whose local write and enqueue both landed.
#[derive(Debug, Clone)]
pub struct Applied {
    pub collection: String,
    pub key: Option<String>,
    pub record: Option<Record>,
    pub descriptor: MutationDescriptor,
}

/// All collections loaded at once, for host start-up.
pub type Snapshot = BTreeMap<String, Vec<Record>>;

pub struct SyncContext {
    store: RecordStore,
    outbox: Arc<Outbox>,
    status: Arc<SyncStatusCoordinator>,
    flusher: Arc<SyncFlusher>,
    scheduler: Arc<dyn Scheduler>,
}

impl SyncContext {
    /// Open the store under `root` and reconcile the sync status with whatever
    /// the outbox still holds from a previous run.
    pub fn open(
        root: &Path,
        registry: CollectionRegistry,
        remote: Arc<dyn RemoteEndpoint>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, PantryError> {
        let store = RecordStore::open(root, registry)?;
        let outbox = Arc::new(Outbox::new(store.pool()));
        let status = Arc::new(SyncStatusCoordinator::new());
        status.reconcile(outbox.len()?);
        let flusher = Arc::new(SyncFlusher::new(
            Arc::clone(&outbox),
            Arc::clone(&status),
            remote,
        ));
        debug!(root = %root.display(), status = %status.status(), "sync context open");
        Ok(Self {
            store,
            outbox,
            status,
            flusher,
            scheduler,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn registry(&self) -> &CollectionRegistry {
        self.store.registry()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.status()
    }

    pub fn subscribe(&self) -> Receiver<SyncEvent> {
        self.status.subscribe()
    }

    pub fn remote_label(&self) -> String {
        self.flusher.remote().describe()
    }

    // --- reads ---

    pub fn get_record(&self, collection: &str, key: &str) -> Result<Option<Record>, PantryError> {
        self.store.get(collection, key)
    }

    pub fn get_all(&self, collection: &str) -> Result<Vec<Record>, PantryError> {
        self.store.get_all(collection)
    }

    /// Load every declared collection.
    pub fn hydrate(&self) -> Result<Snapshot, PantryError> {
        let mut out = Snapshot::new();
        for spec in self.store.collections() {
            out.insert(spec.name.clone(), self.store.get_all(&spec.name)?);
        }
        Ok(out)
    }

    pub fn pending_mutations(&self) -> Result<Vec<MutationDescriptor>, PantryError> {
        self.outbox.drain_all()
    }

    // --- writes ---

    /// Add or replace a record.
    pub fn put_record(&self, collection: &str, record: Record) -> Result<Applied, PantryError> {
        let key = self
            .store
            .put(collection, &record)
            .map_err(|e| PantryError::persistence_failed(collection, e))?;
        let payload = Value::Object(record.clone());
        let descriptor = self.queue(MutationKind::Put, collection, payload)?;
        Ok(Applied {
            collection: collection.to_string(),
            key: Some(key),
            record: Some(record),
            descriptor,
        })
    }

    /// Shallow-merge `patch` over the stored record and write the result in
    /// full. The key field may be repeated but not changed.
    pub fn update_record(
        &self,
        collection: &str,
        key: &str,
        patch: Record,
    ) -> Result<Applied, PantryError> {
        let spec = self.store.spec(collection)?;
        if let Some(v) = patch.get(&spec.key_field) {
            let same = match v {
                Value::String(s) => s == key,
                Value::Number(n) => n.to_string() == key,
                _ => false,
            };
            if !same {
                return Err(PantryError::Validation(format!(
                    "cannot change '{}' of {}/{}",
                    spec.key_field, collection, key
                )));
            }
        }

        let mut record = self
            .store
            .get(collection, key)
            .map_err(|e| PantryError::persistence_failed(collection, e))?
            .ok_or_else(|| PantryError::NotFound(format!("{}/{}", collection, key)))?;
        for (field, value) in patch {
            record.insert(field, value);
        }
        self.put_record(collection, record)
    }

    /// Remove one record. Deleting an absent key still queues the delete so
    /// the remote converges.
    pub fn delete_record(&self, collection: &str, key: &str) -> Result<Applied, PantryError> {
        let payload = self.store.spec(collection)?.key_payload(key);
        self.store
            .delete(collection, key)
            .map_err(|e| PantryError::persistence_failed(collection, e))?;
        let descriptor = self.queue(MutationKind::Delete, collection, payload)?;
        Ok(Applied {
            collection: collection.to_string(),
            key: Some(key.to_string()),
            record: None,
            descriptor,
        })
    }

    /// Empty a collection with a single `clear` descriptor.
    pub fn clear_collection(&self, collection: &str) -> Result<Applied, PantryError> {
        self.store
            .clear(collection)
            .map_err(|e| PantryError::persistence_failed(collection, e))?;
        let descriptor = self.queue(MutationKind::Clear, collection, json!({}))?;
        Ok(Applied {
            collection: collection.to_string(),
            key: None,
            record: None,
            descriptor,
        })
    }

    /// Store one `{key, value}` setting record.
    pub fn set_setting(&self, key: &str, value: Value) -> Result<Applied, PantryError> {
        let mut record = Record::new();
        record.insert("key".to_string(), Value::String(key.to_string()));
        record.insert("value".to_string(), value);
        self.put_record(crate::core::schemas::SETTINGS, record)
    }

    // --- sync ---

    /// Flush now, on the caller's thread.
    pub fn flush_now(&self) -> FlushOutcome {
        self.flusher.flush()
    }

    /// Hand a flush to the scheduler. Never fails the caller.
    pub fn request_flush(&self) {
        let flusher = Arc::clone(&self.flusher);
        self.scheduler.request_deferred_run(Box::new(move || {
            let outcome = flusher.flush();
            debug!(?outcome, "deferred flush finished");
        }));
    }

    /// Drop every queued mutation without sending it. Local records are kept.
    pub fn discard_pending(&self) -> Result<usize, PantryError> {
        let removed = self.outbox.clear_all()?;
        if removed > 0 {
            warn!(removed, "discarded pending mutations");
            self.request_flush();
        }
        Ok(removed)
    }

    /// Write a record that lives on this device only. Nothing is queued and
    /// the sync status is untouched. Synced collections are refused.
    pub fn cache_record(&self, collection: &str, record: Record) -> Result<String, PantryError> {
        if !crate::core::schemas::is_local_only(collection) {
            return Err(PantryError::Validation(format!(
                "collection '{}' is synced; write it through put_record",
                collection
            )));
        }
        self.store
            .put(collection, &record)
            .map_err(|e| PantryError::persistence_failed(collection, e))
    }

    fn queue(
        &self,
        kind: MutationKind,
        collection: &str,
        payload: Value,
    ) -> Result<MutationDescriptor, PantryError> {
        let descriptor = self.outbox.enqueue(kind, collection, payload).map_err(|e| {
            warn!(collection, kind = %kind, error = %e, "local write kept but not queued for sync");
            PantryError::sync_queueing_failed(collection, e)
        })?;
        self.status.mark_pending();
        self.request_flush();
        Ok(descriptor)
    }
}
