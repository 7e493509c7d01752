//! Collaborator traits for the change engine
//!
//! The engine reads prior state through [`SnapshotReader`] and stages its
//! writes through [`ObjectWriter`]. Both are implemented by the storage
//! layers; the engine never touches a store directly.

use crate::error::ChangeResult;
use crate::object::VirtualObject;
use crate::types::{ConcreteRevisionId, Oid, RevisionSet};

/// Read access to committed object state
///
/// Thread safety: implementations are shared between concurrent batches
/// (requires Send + Sync).
pub trait SnapshotReader: Send + Sync {
    /// Materialize an object as of a set of visible revisions
    ///
    /// Returns the state written by the latest revision in `revisions` that
    /// touched `oid`, or None if no such revision exists or that revision
    /// removed the object. Must be side-effect free: repeated calls with the
    /// same arguments return the same object.
    fn resolve(&self, oid: Oid, revisions: &RevisionSet) -> Option<VirtualObject>;

    /// Whether an object is live as of a set of visible revisions
    fn exists(&self, oid: Oid, revisions: &RevisionSet) -> bool {
        self.resolve(oid, revisions).is_some()
    }
}

/// Staged writes into a concrete revision
///
/// Writes stay private to the concrete revision until it commits.
pub trait ObjectWriter: Send + Sync {
    /// Stage the current state of `object` into `concrete`
    ///
    /// # Errors
    ///
    /// `ChangeError::LockConflict` when another writer holds the object or
    /// committed it after the concrete revision's base;
    /// `ChangeError::InvalidState` when `concrete` is not an open concrete
    /// revision.
    fn persist(&self, object: &VirtualObject, concrete: ConcreteRevisionId) -> ChangeResult<()>;

    /// Stage the removal of `oid` into `concrete`
    ///
    /// Fails like [`ObjectWriter::persist`].
    fn persist_removal(&self, oid: Oid, concrete: ConcreteRevisionId) -> ChangeResult<()>;
}
