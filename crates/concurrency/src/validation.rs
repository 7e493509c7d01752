//! Write-set validation
//!
//! Conflict rules:
//! - First-committer-wins on the WRITE set: an object staged by a concrete
//!   revision must not have a committed version newer than its base revision
//! - Every staged object must still be locked by the staging revision
//! - Reads are not tracked; a batch that only reads an object never conflicts

use bimstore_core::{
    ConcreteRevisionId, LockConflict, LockConflictKind, Oid, RevisionId,
};
use bimstore_storage::ObjectStore;

use crate::locks::LockTable;
use crate::transaction::ConcreteRevision;

/// Types of conflicts found while validating a write set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// Object was committed after the writer's base revision
    StaleWrite {
        /// Contended object
        oid: Oid,
        /// Base revision of the writer
        base: RevisionId,
        /// Newest committed revision of the object
        committed: RevisionId,
    },

    /// Object's write lock belongs to another concrete revision
    LockHeld {
        /// Contended object
        oid: Oid,
        /// Lock owner
        holder: ConcreteRevisionId,
    },
}

impl ConflictType {
    /// Contended object
    pub fn oid(&self) -> Oid {
        match self {
            ConflictType::StaleWrite { oid, .. } | ConflictType::LockHeld { oid, .. } => *oid,
        }
    }

    /// Caller-facing form of this conflict
    pub fn into_lock_conflict(self, concrete: ConcreteRevisionId) -> LockConflict {
        match self {
            ConflictType::StaleWrite {
                oid,
                base,
                committed,
            } => LockConflict {
                oid,
                concrete_revision: concrete,
                kind: LockConflictKind::StaleBase { base, committed },
            },
            ConflictType::LockHeld { oid, holder } => LockConflict {
                oid,
                concrete_revision: concrete,
                kind: LockConflictKind::LockHeld { holder },
            },
        }
    }
}

/// Result of write-set validation
///
/// Accumulates all conflicts found. A concrete revision commits only if
/// `is_valid()` returns true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Create a validation result with a single conflict
    pub fn conflict(conflict: ConflictType) -> Self {
        ValidationResult {
            conflicts: vec![conflict],
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.conflicts.extend(other.conflicts);
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Check that `oid` has no committed version newer than `base`
pub fn check_freshness(store: &ObjectStore, oid: Oid, base: RevisionId) -> Option<ConflictType> {
    match store.latest_revision(oid) {
        Some(committed) if committed > base => Some(ConflictType::StaleWrite {
            oid,
            base,
            committed,
        }),
        _ => None,
    }
}

/// Validate every staged object against the store and the lock table
pub fn validate_write_set(
    revision: &ConcreteRevision,
    store: &ObjectStore,
    locks: &LockTable,
) -> ValidationResult {
    let mut result = ValidationResult::ok();

    for oid in revision.write_set.keys() {
        if let Some(holder) = locks.holder(*oid) {
            if holder != revision.id {
                result
                    .conflicts
                    .push(ConflictType::LockHeld { oid: *oid, holder });
            }
        }
        if let Some(conflict) = check_freshness(store, *oid, revision.base) {
            result.conflicts.push(conflict);
        }
    }

    result
}
