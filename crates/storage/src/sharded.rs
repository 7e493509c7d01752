//! Multi-version object store
//!
//! Objects are sharded by entity type: a DashMap keyed by `TypeId` holds one
//! `Shard` per type, and each shard maps oids to their version chains.
//!
//! # Design
//!
//! - DashMap: sharded by type id, lock-free reads
//! - FxHashMap: O(1) oid lookups inside a shard
//! - VersionChain: newest-first committed versions, tombstones included
//!
//! # Visibility
//!
//! A read names the set of revisions it may see. The visible version of an
//! object is the newest version whose revision is in that set. Revisions of
//! other projects, and revisions still being committed, are never in a
//! reader's set, so a batch applied here is invisible until its revision is
//! published by the owning project.

use chrono::Utc;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

use bimstore_core::{ChangeError, ChangeResult, ObjectState, Oid, RevisionId, RevisionSet, TypeId};

use crate::stored_value::StoredObject;

/// Version chain of one object
///
/// Versions are stored newest first; the revision of each pushed version is
/// strictly greater than the one before it.
#[derive(Debug, Clone)]
pub struct VersionChain {
    versions: VecDeque<StoredObject>,
}

impl VersionChain {
    /// Create a chain with a single version
    pub fn new(stored: StoredObject) -> Self {
        let mut versions = VecDeque::with_capacity(4);
        versions.push_front(stored);
        Self { versions }
    }

    /// Add a newer version
    #[inline]
    pub fn push(&mut self, stored: StoredObject) {
        self.versions.push_front(stored);
    }

    /// Newest version whose revision is in `revisions`
    pub fn visible(&self, revisions: &RevisionSet) -> Option<&StoredObject> {
        self.versions
            .iter()
            .find(|stored| revisions.contains(stored.revision()))
    }

    /// Newest committed version
    #[inline]
    pub fn latest(&self) -> Option<&StoredObject> {
        self.versions.front()
    }

    /// Number of versions stored
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Versions newest first, at most `limit` of them
    pub fn history(&self, limit: Option<usize>) -> Vec<&StoredObject> {
        let limit = limit.unwrap_or(usize::MAX);
        self.versions.iter().take(limit).collect()
    }
}

/// All objects of one entity type
#[derive(Debug, Default)]
pub struct Shard {
    pub(crate) data: FxHashMap<Oid, VersionChain>,
}

impl Shard {
    /// Create an empty shard
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects with at least one version
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the shard is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Multi-version object store shared by every project
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - reads take a shard read guard only
/// - writes lock the target type's shard only
/// - revision and oid counters are atomics
pub struct ObjectStore {
    shards: DashMap<TypeId, Shard>,
    /// Last allocated revision id
    version: AtomicU64,
    /// Last allocated oid counter
    oid_counter: AtomicU64,
}

impl ObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            shards: DashMap::new(),
            version: AtomicU64::new(0),
            oid_counter: AtomicU64::new(0),
        }
    }

    /// Last allocated revision id
    #[inline]
    pub fn version(&self) -> RevisionId {
        RevisionId(self.version.load(Ordering::Acquire))
    }

    /// Allocate the next revision id
    #[inline]
    pub fn next_revision(&self) -> RevisionId {
        RevisionId(self.version.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Allocate a fresh oid for an object of `type_id`
    ///
    /// Counters are store wide, so oids never repeat across types.
    pub fn allocate_oid(&self, type_id: TypeId) -> ChangeResult<Oid> {
        let counter = self.oid_counter.fetch_add(1, Ordering::AcqRel) + 1;
        if counter > Oid::COUNTER_MASK {
            error!(target: "bimstore::commit", counter, "oid counter space exhausted");
            return Err(ChangeError::Storage("oid counter space exhausted".to_string()));
        }
        Ok(Oid::new(type_id, counter))
    }

    /// Number of type shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of objects with at least one version, across all shards
    pub fn total_entries(&self) -> usize {
        self.shards.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether any version of `oid` was ever committed
    pub fn contains(&self, oid: Oid) -> bool {
        self.shards
            .get(&oid.type_id())
            .map(|shard| shard.data.contains_key(&oid))
            .unwrap_or(false)
    }

    /// State of `oid` visible to `revisions`; None if absent or removed
    pub fn get_visible(&self, oid: Oid, revisions: &RevisionSet) -> Option<Arc<ObjectState>> {
        let shard = self.shards.get(&oid.type_id())?;
        let chain = shard.data.get(&oid)?;
        chain.visible(revisions)?.state().cloned()
    }

    /// Revision of the newest committed version of `oid`, tombstones included
    pub fn latest_revision(&self, oid: Oid) -> Option<RevisionId> {
        let shard = self.shards.get(&oid.type_id())?;
        let chain = shard.data.get(&oid)?;
        chain.latest().map(StoredObject::revision)
    }

    /// Committed versions of `oid`, newest first
    pub fn history(&self, oid: Oid, limit: Option<usize>) -> Vec<StoredObject> {
        self.shards
            .get(&oid.type_id())
            .and_then(|shard| {
                shard
                    .data
                    .get(&oid)
                    .map(|chain| chain.history(limit).into_iter().cloned().collect())
            })
            .unwrap_or_default()
    }

    /// Live objects of one type visible to `revisions`, sorted by oid
    pub fn list_by_type(&self, type_id: TypeId, revisions: &RevisionSet) -> Vec<Arc<ObjectState>> {
        self.shards
            .get(&type_id)
            .map(|shard| {
                let mut results: Vec<_> = shard
                    .data
                    .values()
                    .filter_map(|chain| chain.visible(revisions)?.state().cloned())
                    .collect();
                results.sort_by_key(|state| state.oid);
                results
            })
            .unwrap_or_default()
    }

    /// Write every entry of a batch as a version of `revision`
    ///
    /// `None` states are removals. The batch is checked before anything is
    /// written: an entry whose chain already holds `revision` or a newer one
    /// fails the whole batch with `ChangeError::Storage`.
    pub fn apply_batch(
        &self,
        writes: &[(Oid, Option<Arc<ObjectState>>)],
        revision: RevisionId,
    ) -> ChangeResult<()> {
        for (oid, _) in writes {
            if let Some(latest) = self.latest_revision(*oid) {
                if latest >= revision {
                    error!(
                        target: "bimstore::commit",
                        %oid, %latest, %revision,
                        "revision order violated in version chain"
                    );
                    return Err(ChangeError::Storage(format!(
                        "object {} already has version {} not older than {}",
                        oid, latest, revision
                    )));
                }
            }
        }

        let committed_at = Utc::now();
        for (oid, state) in writes {
            let stored = StoredObject::new(revision, state.clone(), committed_at);
            let mut shard = self.shards.entry(oid.type_id()).or_default();
            match shard.data.get_mut(oid) {
                Some(chain) => chain.push(stored),
                None => {
                    shard.data.insert(*oid, VersionChain::new(stored));
                }
            }
        }

        self.version.fetch_max(revision.as_u64(), Ordering::AcqRel);
        Ok(())
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("shard_count", &self.shard_count())
            .field("version", &self.version())
            .field("total_entries", &self.total_entries())
            .finish()
    }
}
