//! Storage layer for bimstore
//!
//! This crate implements the in-memory object store behind the change
//! engine:
//! - ObjectStore: DashMap of per-type shards holding version chains
//! - StoredObject: one committed version (state or tombstone)
//! - Revision and oid allocation with AtomicU64
//! - StoreReader: schema-bound `SnapshotReader` implementation
//!
//! # Concurrency
//!
//! - Lock-free reads via DashMap
//! - Per-type sharding (writes to different types never contend)
//! - FxHashMap for O(1) oid lookups

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod sharded;
pub mod snapshot;
pub mod stored_value;

pub use sharded::{ObjectStore, Shard, VersionChain};
pub use snapshot::StoreReader;
pub use stored_value::StoredObject;
