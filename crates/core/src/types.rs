//! Identifier types for bimstore
//!
//! This module defines the foundational identifiers used throughout the system:
//! - Oid: 64-bit object id carrying the entity type id in its high bits
//! - TypeId: numeric id of an entity type within a schema
//! - RevisionId: committed, queryable revision
//! - ConcreteRevisionId: revision under construction, owned by one batch
//! - ProjectId: project that owns a chain of revisions
//! - RevisionSet: set of revisions visible to a read

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Numeric id of an entity type within a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u16);

impl TypeId {
    /// Raw numeric value
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Position of this type in the schema's type table
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Stable 64-bit object identifier
///
/// Layout: the high 16 bits hold the [`TypeId`] of the object's entity type,
/// the low 48 bits hold a store-wide counter. The expected type of any oid
/// can therefore be recovered without reading the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Oid(u64);

impl Oid {
    /// Number of bits used by the counter part
    pub const COUNTER_BITS: u32 = 48;
    /// Mask for the counter part
    pub const COUNTER_MASK: u64 = (1 << Self::COUNTER_BITS) - 1;

    /// Compose an oid from a type id and a counter value
    ///
    /// Counter bits above 48 are discarded.
    pub fn new(type_id: TypeId, counter: u64) -> Self {
        Oid(((type_id.0 as u64) << Self::COUNTER_BITS) | (counter & Self::COUNTER_MASK))
    }

    /// Wrap a raw 64-bit id received from a caller
    pub fn from_raw(raw: u64) -> Self {
        Oid(raw)
    }

    /// Raw 64-bit value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Entity type encoded in this oid
    pub fn type_id(&self) -> TypeId {
        TypeId((self.0 >> Self::COUNTER_BITS) as u16)
    }

    /// Counter part of this oid
    pub fn counter(&self) -> u64 {
        self.0 & Self::COUNTER_MASK
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Oid {
    fn from(raw: u64) -> Self {
        Oid(raw)
    }
}

/// Committed revision identifier
///
/// Allocated from one monotonically increasing store-wide counter, so a larger
/// id always means a later commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RevisionId(pub u64);

impl RevisionId {
    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Identifier of a revision under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConcreteRevisionId(pub u64);

impl ConcreteRevisionId {
    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConcreteRevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of revisions visible to a read
///
/// A read resolves each object to its newest version whose revision is a
/// member of this set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSet {
    revisions: BTreeSet<RevisionId>,
}

impl RevisionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing a single revision
    pub fn single(revision: RevisionId) -> Self {
        let mut set = Self::new();
        set.insert(revision);
        set
    }

    /// Add a revision to the set
    pub fn insert(&mut self, revision: RevisionId) {
        self.revisions.insert(revision);
    }

    /// Check membership
    pub fn contains(&self, revision: RevisionId) -> bool {
        self.revisions.contains(&revision)
    }

    /// Newest revision in the set
    pub fn latest(&self) -> Option<RevisionId> {
        self.revisions.iter().next_back().copied()
    }

    /// Number of revisions in the set
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Iterate revisions in ascending order
    pub fn iter(&self) -> impl Iterator<Item = RevisionId> + '_ {
        self.revisions.iter().copied()
    }
}

impl FromIterator<RevisionId> for RevisionSet {
    fn from_iter<I: IntoIterator<Item = RevisionId>>(iter: I) -> Self {
        RevisionSet {
            revisions: iter.into_iter().collect(),
        }
    }
}
