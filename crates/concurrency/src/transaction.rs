//! Concrete revision context
//!
//! A `ConcreteRevision` is the revision under construction: it records the
//! base revision its batch reads from and buffers every staged object state
//! until commit. It is owned by exactly one batch.
//!
//! # Lifecycle
//!
//! 1. **BEGIN**: created by `RevisionManager::begin`, status `Active`
//! 2. **STAGE**: `ObjectWriter::persist` / `persist_removal` buffer writes
//! 3. **VALIDATE**: `mark_validating`, write set checked against the store
//! 4. **COMMIT/ABORT**: `mark_committed` or `mark_aborted`

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use bimstore_core::{
    ChangeError, ChangeResult, ConcreteRevisionId, ObjectState, Oid, ProjectId, RevisionId,
};

use crate::validation::ValidationResult;

/// Error type for commit failures
///
/// - All-or-nothing commit: a concrete revision either commits or aborts entirely
/// - First-committer-wins: a write set is rejected when any of its objects
///   was committed after the base revision
#[derive(Debug, Clone, Error)]
pub enum CommitError {
    /// Write set conflicts with a revision committed after the base
    #[error("commit of {concrete} failed: {} conflict(s)", .result.conflict_count())]
    ValidationFailed {
        /// Concrete revision that lost
        concrete: ConcreteRevisionId,
        /// Conflicts found during validation
        result: ValidationResult,
    },

    /// Concrete revision was not in a state that allows commit
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Store rejected the write set
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<CommitError> for ChangeError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed { concrete, result } => {
                match result.conflicts.into_iter().next() {
                    Some(conflict) => ChangeError::LockConflict(conflict.into_lock_conflict(concrete)),
                    None => ChangeError::InvalidState(format!(
                        "validation of {} failed without conflicts",
                        concrete
                    )),
                }
            }
            CommitError::InvalidState(msg) => ChangeError::InvalidState(msg),
            CommitError::Storage(msg) => ChangeError::Storage(msg),
        }
    }
}

/// Result of committing a concrete revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Revision id assigned to the write set
    pub revision: RevisionId,
    /// Concrete revision that was promoted
    pub concrete: ConcreteRevisionId,
    /// Owning project
    pub project: ProjectId,
    /// Revision the batch was applied against
    pub base: RevisionId,
    /// Number of object states written
    pub objects_written: usize,
    /// Number of objects removed
    pub objects_removed: usize,
}

impl CommitOutcome {
    /// Total number of objects touched
    pub fn total_objects(&self) -> usize {
        self.objects_written + self.objects_removed
    }
}

/// Summary of staged operations that would be discarded on abort
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingOperations {
    /// Number of staged object states
    pub writes: usize,
    /// Number of staged removals
    pub removals: usize,
}

impl PendingOperations {
    /// Total number of staged operations
    pub fn total(&self) -> usize {
        self.writes + self.removals
    }

    /// Check if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Status of a concrete revision in its lifecycle
///
/// State transitions:
/// - `Active` → `Validating` (begin commit)
/// - `Validating` → `Committed` (validation passed)
/// - `Validating` → `Aborted` (conflict detected)
/// - `Active` → `Aborted` (batch failed or caller abort)
///
/// `Committed` and `Aborted` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionStatus {
    /// Accepting staged writes
    Active,
    /// Write set is being validated
    Validating,
    /// Promoted to a queryable revision
    Committed,
    /// Discarded
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// Revision under construction
#[derive(Debug)]
pub struct ConcreteRevision {
    /// Concrete revision id
    pub id: ConcreteRevisionId,
    /// Owning project
    pub project: ProjectId,
    /// Revision the batch reads from
    pub base: RevisionId,
    /// Staged states by oid; `None` stages a removal
    ///
    /// Ordered so the committed version chains are written deterministically.
    pub write_set: BTreeMap<Oid, Option<Arc<ObjectState>>>,
    /// Current status
    pub status: RevisionStatus,
    start_time: Instant,
}

impl ConcreteRevision {
    /// Create an active concrete revision
    pub fn new(id: ConcreteRevisionId, project: ProjectId, base: RevisionId) -> Self {
        Self {
            id,
            project,
            base,
            write_set: BTreeMap::new(),
            status: RevisionStatus::Active,
            start_time: Instant::now(),
        }
    }

    /// Stage a state (or a removal with `None`), replacing any earlier staging of `oid`
    pub fn stage(&mut self, oid: Oid, state: Option<Arc<ObjectState>>) -> ChangeResult<()> {
        self.ensure_active()?;
        self.write_set.insert(oid, state);
        Ok(())
    }

    /// Whether `oid` is staged in this revision
    pub fn is_staged(&self, oid: Oid) -> bool {
        self.write_set.contains_key(&oid)
    }

    /// Check if the revision accepts writes
    pub fn is_active(&self) -> bool {
        self.status == RevisionStatus::Active
    }

    /// Check if the revision committed
    pub fn is_committed(&self) -> bool {
        self.status == RevisionStatus::Committed
    }

    /// Check if the revision was aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RevisionStatus::Aborted { .. })
    }

    /// Abort reason, if aborted
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            RevisionStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }

    /// Time since the revision was begun
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fail unless the revision is `Active`
    pub fn ensure_active(&self) -> ChangeResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ChangeError::InvalidState(format!(
                "concrete revision {} is {:?}, not Active",
                self.id, self.status
            )))
        }
    }

    /// `Active` → `Validating`
    pub fn mark_validating(&mut self) -> ChangeResult<()> {
        self.ensure_active()?;
        self.status = RevisionStatus::Validating;
        Ok(())
    }

    /// `Validating` → `Committed`
    pub fn mark_committed(&mut self) -> ChangeResult<()> {
        match &self.status {
            RevisionStatus::Validating => {
                self.status = RevisionStatus::Committed;
                Ok(())
            }
            _ => Err(ChangeError::InvalidState(format!(
                "cannot commit concrete revision {} from state {:?}",
                self.id, self.status
            ))),
        }
    }

    /// `Active`/`Validating` → `Aborted`; discards the write set
    pub fn mark_aborted(&mut self, reason: String) -> ChangeResult<()> {
        match &self.status {
            RevisionStatus::Committed => Err(ChangeError::InvalidState(format!(
                "cannot abort committed concrete revision {}",
                self.id
            ))),
            RevisionStatus::Aborted { .. } => Err(ChangeError::InvalidState(format!(
                "concrete revision {} already aborted",
                self.id
            ))),
            _ => {
                self.status = RevisionStatus::Aborted { reason };
                self.write_set.clear();
                Ok(())
            }
        }
    }

    /// Counts of staged writes and removals
    pub fn pending_operations(&self) -> PendingOperations {
        let removals = self.write_set.values().filter(|s| s.is_none()).count();
        PendingOperations {
            writes: self.write_set.len() - removals,
            removals,
        }
    }

    /// Staged entries in oid order
    pub fn writes(&self) -> Vec<(Oid, Option<Arc<ObjectState>>)> {
        self.write_set
            .iter()
            .map(|(oid, state)| (*oid, state.clone()))
            .collect()
    }
}
