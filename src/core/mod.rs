//! The storage/sync engine.
//!
//! Leaves first: the record store and outbox sit on one SQLite file, the
//! flusher drains the outbox against a remote endpoint, the status
//! coordinator tracks `synced`/`pending`/`syncing`, and the facade is the
//! single write path tying them together.

pub mod collection;
pub mod config;
pub mod db;
pub mod error;
pub mod facade;
pub mod flusher;
pub mod migration;
pub mod outbox;
pub mod output;
pub mod pool;
pub mod remote;
pub mod scheduler;
pub mod schemas;
pub mod status;
pub mod store;
pub mod telemetry;
pub mod time;
