//! Per-object write locks
//!
//! Each object staged into a concrete revision is locked for that revision
//! until it commits or aborts. A second concrete revision staging the same
//! object fails immediately instead of waiting.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use bimstore_core::{ConcreteRevisionId, Oid};

/// Object lock table shared by every concrete revision
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<Oid, ConcreteRevisionId>,
}

impl LockTable {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `oid` for `concrete`
    ///
    /// Returns `Ok(true)` when the lock was newly taken, `Ok(false)` when
    /// `concrete` already held it, and `Err(holder)` when another concrete
    /// revision owns it.
    pub fn acquire(
        &self,
        oid: Oid,
        concrete: ConcreteRevisionId,
    ) -> Result<bool, ConcreteRevisionId> {
        match self.locks.entry(oid) {
            Entry::Occupied(entry) => {
                let holder = *entry.get();
                if holder == concrete {
                    Ok(false)
                } else {
                    Err(holder)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(concrete);
                Ok(true)
            }
        }
    }

    /// Current owner of `oid`'s lock
    pub fn holder(&self, oid: Oid) -> Option<ConcreteRevisionId> {
        self.locks.get(&oid).map(|entry| *entry.value())
    }

    /// Release `oid` if `concrete` holds it; returns whether it did
    pub fn release(&self, oid: Oid, concrete: ConcreteRevisionId) -> bool {
        self.locks
            .remove_if(&oid, |_, holder| *holder == concrete)
            .is_some()
    }

    /// Release every listed lock held by `concrete`; returns how many were released
    pub fn release_all<I>(&self, oids: I, concrete: ConcreteRevisionId) -> usize
    where
        I: IntoIterator<Item = Oid>,
    {
        oids.into_iter()
            .filter(|oid| self.release(*oid, concrete))
            .count()
    }

    /// Number of locked objects
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Check if no object is locked
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
