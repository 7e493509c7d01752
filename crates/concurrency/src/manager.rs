//! Revision manager for coordinating staged writes and commits
//!
//! Provides atomic commit of a concrete revision by orchestrating:
//! 1. Lock acquisition and freshness checks at persist time
//! 2. Validation of the whole write set under the commit lock
//! 3. Storage application and publication of the new revision
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. take the concrete revision out of the active table
//! 2. mark_validating()
//! 3. lock commit_lock
//! 4. validate_write_set() - first committer wins
//! 5. IF conflicts: abort, release locks, return error
//! 6. allocate revision id, apply_batch() to the store
//! 7. publish(revision) - caller makes the revision visible
//! 8. mark_committed(), release locks
//! ```
//!
//! Nothing a concrete revision stages is visible to readers before step 7,
//! so a failure at any earlier step leaves no trace.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use bimstore_core::{
    ChangeError, ChangeResult, ConcreteRevisionId, ObjectState, ObjectWriter, Oid, ProjectId,
    RevisionId, VirtualObject,
};
use bimstore_storage::ObjectStore;

use crate::locks::LockTable;
use crate::transaction::{CommitError, CommitOutcome, ConcreteRevision, PendingOperations};
use crate::validation::{check_freshness, validate_write_set, ConflictType};

/// Manages concrete revision lifecycle and atomic commits
///
/// Implements [`ObjectWriter`]: the change engine persists into a concrete
/// revision by id, and this manager enforces the lock discipline.
pub struct RevisionManager {
    store: Arc<ObjectStore>,
    locks: LockTable,
    active: DashMap<ConcreteRevisionId, ConcreteRevision>,
    next_concrete: AtomicU64,
    /// Serializes validation and application of write sets
    commit_lock: Mutex<()>,
}

impl RevisionManager {
    /// Create a manager writing into `store`
    pub fn new(store: Arc<ObjectStore>) -> Self {
        RevisionManager {
            store,
            locks: LockTable::new(),
            active: DashMap::new(),
            next_concrete: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// Number of open concrete revisions
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of objects currently locked
    pub fn locked_count(&self) -> usize {
        self.locks.len()
    }

    /// Current lock owner of `oid`
    pub fn lock_holder(&self, oid: Oid) -> Option<ConcreteRevisionId> {
        self.locks.holder(oid)
    }

    /// Whether `concrete` is open
    pub fn is_active(&self, concrete: ConcreteRevisionId) -> bool {
        self.active.contains_key(&concrete)
    }

    /// Staged operations of an open concrete revision
    pub fn pending_operations(&self, concrete: ConcreteRevisionId) -> Option<PendingOperations> {
        self.active.get(&concrete).map(|rev| rev.pending_operations())
    }

    /// Open a concrete revision for `project` on top of `base`
    pub fn begin(&self, project: ProjectId, base: RevisionId) -> ConcreteRevisionId {
        let id = ConcreteRevisionId(self.next_concrete.fetch_add(1, Ordering::SeqCst));
        self.active.insert(id, ConcreteRevision::new(id, project, base));
        debug!(target: "bimstore::commit", concrete = %id, %project, %base, "concrete revision opened");
        id
    }

    /// Commit a concrete revision atomically
    ///
    /// `publish` runs under the commit lock after the write set is stored and
    /// before any other commit can validate, so the caller can make the new
    /// revision visible without a window where a conflicting commit slips in.
    ///
    /// # Errors
    ///
    /// - `CommitError::InvalidState` if `concrete` is not open
    /// - `CommitError::ValidationFailed` if a staged object lost its lock or
    ///   was committed after the base revision
    /// - `CommitError::Storage` if the store rejects the write set
    ///
    /// On any error the concrete revision is aborted and its locks released.
    pub fn commit<F>(
        &self,
        concrete: ConcreteRevisionId,
        publish: F,
    ) -> Result<CommitOutcome, CommitError>
    where
        F: FnOnce(RevisionId),
    {
        let (_, mut revision) = self.active.remove(&concrete).ok_or_else(|| {
            CommitError::InvalidState(format!("concrete revision {} is not open", concrete))
        })?;
        revision
            .mark_validating()
            .map_err(|e| CommitError::InvalidState(e.to_string()))?;

        let _guard = self.commit_lock.lock();

        let result = validate_write_set(&revision, &self.store, &self.locks);
        if !result.is_valid() {
            warn!(
                target: "bimstore::commit",
                %concrete,
                conflicts = result.conflict_count(),
                "write set validation failed"
            );
            self.discard(&mut revision, format!("{} conflict(s)", result.conflict_count()));
            return Err(CommitError::ValidationFailed { concrete, result });
        }

        let writes = revision.writes();
        let pending = revision.pending_operations();
        let revision_id = self.store.next_revision();
        if let Err(e) = self.store.apply_batch(&writes, revision_id) {
            self.discard(&mut revision, e.to_string());
            return Err(CommitError::Storage(e.to_string()));
        }
        publish(revision_id);

        revision
            .mark_committed()
            .map_err(|e| CommitError::InvalidState(e.to_string()))?;
        self.locks
            .release_all(revision.write_set.keys().copied(), concrete);

        info!(
            target: "bimstore::commit",
            %concrete,
            revision = %revision_id,
            project = %revision.project,
            objects = writes.len(),
            "revision committed"
        );

        Ok(CommitOutcome {
            revision: revision_id,
            concrete,
            project: revision.project,
            base: revision.base,
            objects_written: pending.writes,
            objects_removed: pending.removals,
        })
    }

    /// Abort an open concrete revision, discarding its write set
    pub fn abort(&self, concrete: ConcreteRevisionId, reason: impl Into<String>) -> ChangeResult<()> {
        let (_, mut revision) = self.active.remove(&concrete).ok_or_else(|| {
            ChangeError::InvalidState(format!("concrete revision {} is not open", concrete))
        })?;
        let reason = reason.into();
        warn!(target: "bimstore::commit", %concrete, reason = %reason, "concrete revision aborted");
        self.discard(&mut revision, reason);
        Ok(())
    }

    fn discard(&self, revision: &mut ConcreteRevision, reason: String) {
        let oids: Vec<Oid> = revision.write_set.keys().copied().collect();
        let released = self.locks.release_all(oids, revision.id);
        if revision.mark_aborted(reason).is_err() {
            debug!(target: "bimstore::lock", concrete = %revision.id, "revision already terminal");
        }
        debug!(target: "bimstore::lock", concrete = %revision.id, released, "locks released");
    }

    fn stage(
        &self,
        oid: Oid,
        concrete: ConcreteRevisionId,
        state: Option<Arc<ObjectState>>,
    ) -> ChangeResult<()> {
        let mut revision = self.active.get_mut(&concrete).ok_or_else(|| {
            ChangeError::InvalidState(format!("concrete revision {} is not open", concrete))
        })?;
        revision.ensure_active()?;

        let newly_locked = match self.locks.acquire(oid, concrete) {
            Ok(newly_locked) => newly_locked,
            Err(holder) => {
                warn!(target: "bimstore::lock", %oid, %concrete, %holder, "object locked by another revision");
                return Err(ConflictType::LockHeld { oid, holder }
                    .into_lock_conflict(concrete)
                    .into());
            }
        };

        if let Some(conflict) = check_freshness(&self.store, oid, revision.base) {
            if newly_locked {
                self.locks.release(oid, concrete);
            }
            warn!(target: "bimstore::lock", %oid, %concrete, base = %revision.base, "object changed after base revision");
            return Err(conflict.into_lock_conflict(concrete).into());
        }

        debug!(target: "bimstore::lock", %oid, %concrete, removal = state.is_none(), "object staged");
        revision.stage(oid, state)
    }
}

impl ObjectWriter for RevisionManager {
    fn persist(&self, object: &VirtualObject, concrete: ConcreteRevisionId) -> ChangeResult<()> {
        self.stage(object.oid(), concrete, Some(Arc::new(object.to_state())))
    }

    fn persist_removal(&self, oid: Oid, concrete: ConcreteRevisionId) -> ChangeResult<()> {
        self.stage(oid, concrete, None)
    }
}

impl std::fmt::Debug for RevisionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionManager")
            .field("active", &self.active_count())
            .field("locked", &self.locked_count())
            .field("store", &self.store)
            .finish()
    }
}
