//! Storage-layer object version
//!
//! A `StoredObject` is one entry of an object's version chain: the state a
//! committed revision wrote, or a tombstone when that revision removed the
//! object. The commit timestamp is a storage concern and never reaches the
//! engine's `VirtualObject`.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use bimstore_core::{ObjectState, RevisionId};

/// One committed version of an object
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Revision that wrote this version
    revision: RevisionId,
    /// Written state, `None` for a removal
    state: Option<Arc<ObjectState>>,
    /// Commit time of the writing revision
    committed_at: DateTime<Utc>,
}

impl StoredObject {
    /// Create a stored version with an explicit commit time
    pub fn new(
        revision: RevisionId,
        state: Option<Arc<ObjectState>>,
        committed_at: DateTime<Utc>,
    ) -> Self {
        StoredObject {
            revision,
            state,
            committed_at,
        }
    }

    /// Create a tombstone
    pub fn tombstone(revision: RevisionId, committed_at: DateTime<Utc>) -> Self {
        Self::new(revision, None, committed_at)
    }

    /// Revision that wrote this version
    #[inline]
    pub fn revision(&self) -> RevisionId {
        self.revision
    }

    /// Written state, `None` for a tombstone
    #[inline]
    pub fn state(&self) -> Option<&Arc<ObjectState>> {
        self.state.as_ref()
    }

    /// Whether this version removed the object
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.state.is_none()
    }

    /// Commit time of the writing revision
    #[inline]
    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }
}
