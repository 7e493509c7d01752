//! Concurrency layer for bimstore
//!
//! This crate implements the lock discipline behind concrete revisions:
//! - ConcreteRevision: staged write set of one batch
//! - LockTable: per-object write locks, fail-fast on contention
//! - Validation: first-committer-wins check of the write set at commit
//! - RevisionManager: begin/persist/commit/abort, implements `ObjectWriter`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod locks;
pub mod manager;
pub mod transaction;
pub mod validation;

pub use locks::LockTable;
pub use manager::RevisionManager;
pub use transaction::{
    CommitError, CommitOutcome, ConcreteRevision, PendingOperations, RevisionStatus,
};
pub use validation::{check_freshness, validate_write_set, ConflictType, ValidationResult};
