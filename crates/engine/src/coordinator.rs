//! Batch coordinator for managing concrete revision lifecycle
//!
//! The BatchCoordinator wraps the RevisionManager and adds:
//! - Active batch tracking
//! - Batch metrics (started, committed, aborted, lock conflicts)
//! - Commit rate calculation
//!
//! Revision ids come from the store's single monotonic counter, advanced
//! once per commit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use bimstore_concurrency::{CommitOutcome, RevisionManager};
use bimstore_core::{ChangeError, ChangeResult, ConcreteRevisionId, ProjectId, RevisionId};
use bimstore_storage::ObjectStore;

/// Coordinator for batches of changes
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering: they are observational only
/// and synchronize nothing else. Revision allocation and locking live in
/// the RevisionManager.
pub struct BatchCoordinator {
    manager: RevisionManager,
    /// Open batches
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
    /// Aborts caused by a lock conflict, at persist or at commit
    lock_conflicts: AtomicU64,
    /// Changes applied by committed batches
    changes_committed: AtomicU64,
}

impl BatchCoordinator {
    /// Create a coordinator writing into `store`
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self {
            manager: RevisionManager::new(store),
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
            lock_conflicts: AtomicU64::new(0),
            changes_committed: AtomicU64::new(0),
        }
    }

    /// Revision manager; the change engine persists through it
    pub fn manager(&self) -> &RevisionManager {
        &self.manager
    }

    /// Open a concrete revision for a batch on `base`
    pub fn begin(&self, project: ProjectId, base: RevisionId) -> ConcreteRevisionId {
        let concrete = self.manager.begin(project, base);
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
        debug!(target: "bimstore::batch", %concrete, %project, %base, "batch started");
        concrete
    }

    /// Commit a batch of `changes` changes
    ///
    /// `publish` runs under the commit lock; see [`RevisionManager::commit`].
    /// A failed commit has already been aborted by the manager.
    pub fn commit<F>(
        &self,
        concrete: ConcreteRevisionId,
        changes: usize,
        publish: F,
    ) -> ChangeResult<CommitOutcome>
    where
        F: FnOnce(RevisionId),
    {
        match self.manager.commit(concrete, publish) {
            Ok(outcome) => {
                self.record_commit(changes);
                Ok(outcome)
            }
            Err(e) => {
                let err = ChangeError::from(e);
                self.record_abort(&err);
                Err(err)
            }
        }
    }

    /// Abort a batch after `cause` failed it
    pub fn abort(&self, concrete: ConcreteRevisionId, cause: &ChangeError) -> ChangeResult<()> {
        let result = self.manager.abort(concrete, cause.to_string());
        self.record_abort(cause);
        result
    }

    fn record_commit(&self, changes: usize) {
        self.decrement_active();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
        self.changes_committed
            .fetch_add(changes as u64, Ordering::Relaxed);
    }

    fn record_abort(&self, cause: &ChangeError) {
        self.decrement_active();
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
        if cause.is_retryable() {
            self.lock_conflicts.fetch_add(1, Ordering::Relaxed);
            warn!(target: "bimstore::batch", error = %cause, "batch lost a lock conflict");
        }
    }

    // Saturating: the gauge never drops below zero
    fn decrement_active(&self) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Batch metrics snapshot
    pub fn metrics(&self) -> BatchMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        BatchMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
            lock_conflicts: self.lock_conflicts.load(Ordering::Relaxed),
            changes_committed: self.changes_committed.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }

    /// Number of open batches
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("manager", &self.manager)
            .field("metrics", &self.metrics())
            .finish()
    }
}

/// Batch metrics
#[derive(Debug, Clone, PartialEq)]
pub struct BatchMetrics {
    /// Number of currently open batches
    pub active_count: u64,
    /// Total number of batches started
    pub total_started: u64,
    /// Total number of batches committed
    pub total_committed: u64,
    /// Total number of batches aborted
    pub total_aborted: u64,
    /// Aborts caused by lock conflicts
    pub lock_conflicts: u64,
    /// Changes applied by committed batches
    pub changes_committed: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl BatchMetrics {
    /// Batches that completed (committed + aborted)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_aborted
    }

    /// Abort rate (aborted / started)
    pub fn abort_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_aborted as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}
