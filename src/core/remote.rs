//! Remote sync endpoints.
//!
//! A flush hands the whole ordered batch to a [`RemoteEndpoint`] in one call.
//! The remote must apply `put`/`delete`/`clear` idempotently: replaying a
//! batch converges to the same state.

use crate::core::collection::{CollectionRegistry, Record};
use crate::core::outbox::{MutationDescriptor, MutationKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    #[error("remote timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote returned HTTP {0}")]
    Http(u16),
    #[error("remote rejected batch")]
    Rejected,
    #[error("malformed remote response: {0}")]
    Protocol(String),
    #[error("no sync endpoint configured")]
    NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAck {
    pub status: AckStatus,
}

/// One operation as it travels on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct WireOperation<'a> {
    pub sequence: i64,
    pub kind: MutationKind,
    pub collection: &'a str,
    pub payload: &'a Value,
}

#[derive(Debug, Serialize)]
pub struct WireBatch<'a> {
    pub batch_id: String,
    pub operations: Vec<WireOperation<'a>>,
}

impl<'a> WireBatch<'a> {
    pub fn from_descriptors(descriptors: &'a [MutationDescriptor]) -> Self {
        let operations: Vec<WireOperation<'a>> = descriptors
            .iter()
            .map(|d| WireOperation {
                sequence: d.sequence,
                kind: d.kind,
                collection: &d.collection,
                payload: &d.payload,
            })
            .collect();
        Self {
            batch_id: batch_digest(descriptors),
            operations,
        }
    }
}

/// SHA-256 over the ordered operations. A resent batch carries the same id.
pub fn batch_digest(descriptors: &[MutationDescriptor]) -> String {
    let mut hasher = Sha256::new();
    for d in descriptors {
        hasher.update(d.sequence.to_be_bytes());
        hasher.update(d.kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(d.collection.as_bytes());
        hasher.update([0u8]);
        hasher.update(d.payload.to_string().as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

pub trait RemoteEndpoint: Send + Sync {
    fn send_batch(&self, batch: &[MutationDescriptor]) -> Result<RemoteAck, RemoteError>;

    /// Short label for logs and status output.
    fn describe(&self) -> String;
}

/// Used when no endpoint is configured: every flush fails and the queue waits.
pub struct UnconfiguredEndpoint;

impl RemoteEndpoint for UnconfiguredEndpoint {
    fn send_batch(&self, _batch: &[MutationDescriptor]) -> Result<RemoteAck, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    fn describe(&self) -> String {
        "unconfigured".to_string()
    }
}

/// HTTP endpoint: `POST` the batch as JSON and read `{"status": ...}` back.
pub struct HttpEndpoint {
    url: String,
    auth_token: Option<String>,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl HttpEndpoint {
    pub fn new(url: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            auth_token,
            timeout,
            client,
        })
    }
}

impl RemoteEndpoint for HttpEndpoint {
    fn send_batch(&self, batch: &[MutationDescriptor]) -> Result<RemoteAck, RemoteError> {
        let wire = WireBatch::from_descriptors(batch);
        let mut req = self
            .client
            .post(&self.url)
            .header("Idempotency-Key", wire.batch_id.clone())
            .json(&wire);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout(self.timeout)
            } else {
                RemoteError::Unreachable(e.to_string())
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Http(status.as_u16()));
        }
        let ack: RemoteAck = resp
            .json()
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        debug!(url = %self.url, operations = batch.len(), status = ?ack.status, "remote acknowledged batch");
        Ok(ack)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// How an [`InMemoryRemote`] answers the next batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteMode {
    Online,
    Offline,
    Rejecting,
    TimingOut,
}

/// A converging in-memory server for offline demos and tests.
///
/// Keeps per-collection state and the list of batches it accepted, in order.
pub struct InMemoryRemote {
    registry: CollectionRegistry,
    mode: Mutex<RemoteMode>,
    state: Mutex<BTreeMap<String, BTreeMap<String, Record>>>,
    received: Mutex<Vec<Vec<MutationDescriptor>>>,
}

impl InMemoryRemote {
    pub fn new(registry: CollectionRegistry) -> Self {
        Self {
            registry,
            mode: Mutex::new(RemoteMode::Online),
            state: Mutex::new(BTreeMap::new()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: RemoteMode) {
        *self.mode.lock().unwrap_or_else(|p| p.into_inner()) = mode;
    }

    /// Records currently held for `collection`, keyed by primary key.
    pub fn collection(&self, collection: &str) -> BTreeMap<String, Record> {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Whole remote state, for convergence comparisons.
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, Record>> {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Batches accepted so far, in arrival order.
    pub fn received(&self) -> Vec<Vec<MutationDescriptor>> {
        self.received
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Apply one batch to the state. Applying the same batch twice yields the
    /// same state as applying it once. The whole batch is checked first; a
    /// malformed descriptor leaves the state untouched.
    pub fn apply(&self, batch: &[MutationDescriptor]) -> Result<(), RemoteError> {
        let ops = batch
            .iter()
            .map(|d| self.resolve(d))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        for (d, op) in batch.iter().zip(ops) {
            match op {
                Resolved::Put(key, record) => {
                    state
                        .entry(d.collection.clone())
                        .or_default()
                        .insert(key, record);
                }
                Resolved::Delete(key) => {
                    if let Some(c) = state.get_mut(&d.collection) {
                        c.remove(&key);
                    }
                }
                Resolved::Clear => {
                    state.remove(&d.collection);
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, d: &MutationDescriptor) -> Result<Resolved, RemoteError> {
        let spec = self
            .registry
            .get(&d.collection)
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        let record = d.payload.as_object();
        match d.kind {
            MutationKind::Put => {
                let record = record.ok_or_else(|| {
                    RemoteError::Protocol(format!("put #{} without a record", d.sequence))
                })?;
                let key = spec
                    .extract_key(record)
                    .map_err(|e| RemoteError::Protocol(e.to_string()))?;
                Ok(Resolved::Put(key, record.clone()))
            }
            MutationKind::Delete => {
                let record = record.ok_or_else(|| {
                    RemoteError::Protocol(format!("delete #{} without a key", d.sequence))
                })?;
                let key = spec
                    .extract_key(record)
                    .map_err(|e| RemoteError::Protocol(e.to_string()))?;
                Ok(Resolved::Delete(key))
            }
            MutationKind::Clear => Ok(Resolved::Clear),
        }
    }
}

/// A descriptor checked against the registry, ready to apply.
enum Resolved {
    Put(String, Record),
    Delete(String),
    Clear,
}

impl RemoteEndpoint for InMemoryRemote {
    fn send_batch(&self, batch: &[MutationDescriptor]) -> Result<RemoteAck, RemoteError> {
        let mode = *self.mode.lock().unwrap_or_else(|p| p.into_inner());
        match mode {
            RemoteMode::Offline => Err(RemoteError::Unreachable("offline".to_string())),
            RemoteMode::TimingOut => Err(RemoteError::Timeout(Duration::from_secs(20))),
            RemoteMode::Rejecting => Ok(RemoteAck {
                status: AckStatus::Failure,
            }),
            RemoteMode::Online => {
                self.apply(batch)?;
                self.received
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .push(batch.to_vec());
                Ok(RemoteAck {
                    status: AckStatus::Success,
                })
            }
        }
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
