//! Per-batch copy-on-write overlay
//!
//! The overlay holds everything a batch has done so far on top of its
//! previous revision: objects it created, pre-existing objects it mutated,
//! and oids it removed. Later changes of the same batch read through it, so
//! changes apply in submission order against an accumulating view.

use rustc_hash::FxHashMap;

use bimstore_core::{Oid, TypeId, VirtualObject};

/// Created, staged and deleted objects of one batch
#[derive(Debug, Default)]
pub struct BatchOverlay {
    created: FxHashMap<Oid, VirtualObject>,
    staged: FxHashMap<Oid, VirtualObject>,
    deleted: FxHashMap<Oid, TypeId>,
}

impl BatchOverlay {
    /// Empty overlay
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `oid` was removed earlier in the batch
    pub fn is_deleted(&self, oid: Oid) -> bool {
        self.deleted.contains_key(&oid)
    }

    /// Whether `oid` was created earlier in the batch
    pub fn is_created(&self, oid: Oid) -> bool {
        self.created.contains_key(&oid)
    }

    /// Staged copy of a pre-existing object mutated earlier in the batch
    pub fn staged(&self, oid: Oid) -> Option<&VirtualObject> {
        self.staged.get(&oid)
    }

    /// Object created earlier in the batch
    pub fn created(&self, oid: Oid) -> Option<&VirtualObject> {
        self.created.get(&oid)
    }

    /// Record a newly created object
    pub fn insert_created(&mut self, object: VirtualObject) {
        self.deleted.remove(&object.oid());
        self.created.insert(object.oid(), object);
    }

    /// Record the latest state of a mutated object
    ///
    /// Objects created in this batch stay in the created set.
    pub fn record(&mut self, object: VirtualObject) {
        let oid = object.oid();
        match self.created.get_mut(&oid) {
            Some(slot) => *slot = object,
            None => {
                self.staged.insert(oid, object);
            }
        }
    }

    /// Record the removal of an object
    pub fn remove(&mut self, oid: Oid) {
        self.created.remove(&oid);
        self.staged.remove(&oid);
        self.deleted.insert(oid, oid.type_id());
    }

    /// Number of objects created
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    /// Number of pre-existing objects mutated
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Number of objects removed
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Oids created in the batch and still live in it
    pub fn created_oids(&self) -> impl Iterator<Item = Oid> + '_ {
        self.created.keys().copied()
    }

    /// Removed oids with the type each was removed as
    pub fn deleted(&self) -> impl Iterator<Item = (Oid, TypeId)> + '_ {
        self.deleted.iter().map(|(oid, type_id)| (*oid, *type_id))
    }
}
