//! Project ownership of oids
//!
//! Oids are allocated from one store-wide counter, so every oid belongs to
//! exactly one project: the one it was allocated for, or the first one that
//! committed an object under it. A project may never create an object under
//! an oid another project owns.

use dashmap::DashMap;

use bimstore_core::{Oid, ProjectId};

/// Oid to owning project
#[derive(Debug, Default)]
pub struct OidOwners {
    owners: DashMap<Oid, ProjectId>,
}

impl OidOwners {
    /// Empty ownership table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `project` as the owner of `oid` unless it already has one
    ///
    /// Returns the owner after the call.
    pub fn claim(&self, oid: Oid, project: ProjectId) -> ProjectId {
        *self.owners.entry(oid).or_insert(project)
    }

    /// Owner of `oid`, if claimed
    pub fn owner(&self, oid: Oid) -> Option<ProjectId> {
        self.owners.get(&oid).map(|entry| *entry.value())
    }

    /// Whether `oid` is owned by a project other than `project`
    pub fn is_foreign(&self, oid: Oid, project: ProjectId) -> bool {
        matches!(self.owner(oid), Some(owner) if owner != project)
    }

    /// Number of claimed oids
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether no oid is claimed
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
