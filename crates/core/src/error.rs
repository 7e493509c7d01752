//! Error types for bimstore
//!
//! This module defines the error types shared by every layer:
//! - ChangeError: everything that can fail a batch of changes
//! - LockConflict: write contention reported by the storage lock discipline
//! - SchemaError: invalid schema assembly
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

use crate::schema::Cardinality;
use crate::types::{ConcreteRevisionId, Oid, ProjectId, RevisionId};
use crate::value::ValueKind;

/// Result type alias for change application
pub type ChangeResult<T> = std::result::Result<T, ChangeError>;

/// Why a write lost against a concurrent writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockConflictKind {
    /// Another concrete revision holds the object's write lock
    LockHeld {
        /// Concrete revision owning the lock
        holder: ConcreteRevisionId,
    },
    /// The object was committed after the writer's base revision
    StaleBase {
        /// Revision the writer started from
        base: RevisionId,
        /// Newer committed revision of the object
        committed: RevisionId,
    },
}

/// Write contention on one object
///
/// The only retryable failure. The engine never retries; callers may retry
/// the whole batch on a fresh previous revision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lock conflict on object {oid} for {concrete_revision}: {}", describe_conflict(.kind))]
pub struct LockConflict {
    /// Contended object
    pub oid: Oid,
    /// Concrete revision whose write failed
    pub concrete_revision: ConcreteRevisionId,
    /// Kind of conflict
    pub kind: LockConflictKind,
}

fn describe_conflict(kind: &LockConflictKind) -> String {
    match kind {
        LockConflictKind::LockHeld { holder } => format!("locked by {}", holder),
        LockConflictKind::StaleBase { base, committed } => {
            format!("committed in {} after base {}", committed, base)
        }
    }
}

fn describe_shape(got_many: &bool) -> &'static str {
    if *got_many {
        "a sequence"
    } else {
        "a single value"
    }
}

/// Errors raised while applying a batch of changes
///
/// Every variant aborts the whole batch. All variants except `LockConflict`
/// are caller errors and must not be retried unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChangeError {
    /// Target absent from the snapshot and from the batch's created set
    #[error("no object of type \"{expected_type}\" with oid {oid} found")]
    ObjectNotFound {
        /// Requested object
        oid: Oid,
        /// Type name derived from the oid
        expected_type: String,
    },

    /// Schema has no such attribute for the object's type
    #[error("no attribute with the name \"{attribute}\" found in class \"{type_name}\"")]
    AttributeNotFound {
        /// Entity type name
        type_name: String,
        /// Requested attribute
        attribute: String,
    },

    /// Value shape disagrees with the attribute's cardinality
    #[error("attribute \"{attribute}\" is of type '{expected}', got {}", describe_shape(.got_many))]
    CardinalityMismatch {
        /// Attribute name
        attribute: String,
        /// Declared cardinality
        expected: Cardinality,
        /// Whether the supplied value was a sequence
        got_many: bool,
    },

    /// Text does not name a literal of the attribute's enumeration
    #[error("\"{literal}\" is not a literal of the enumeration of attribute \"{attribute}\"")]
    InvalidEnumLiteral {
        /// Attribute name
        attribute: String,
        /// Supplied text
        literal: String,
    },

    /// Index outside the attribute's current bounds
    #[error("index {index} out of range for attribute \"{attribute}\" of length {current_length}")]
    IndexOutOfRange {
        /// Attribute name
        attribute: String,
        /// Requested index
        index: i64,
        /// Current number of slots
        current_length: usize,
    },

    /// Value kind disagrees with the attribute's element type
    #[error("attribute \"{attribute}\" expects {expected}, got {got}")]
    TypeMismatch {
        /// Attribute name
        attribute: String,
        /// Declared element kind
        expected: ValueKind,
        /// Supplied value kind
        got: ValueKind,
    },

    /// Attribute is derived from another attribute and cannot be written directly
    #[error("attribute \"{attribute}\" of class \"{type_name}\" is maintained from its float counterpart")]
    ReadOnlyAttribute {
        /// Entity type name
        type_name: String,
        /// Attribute name
        attribute: String,
    },

    /// Concurrent writer won
    #[error(transparent)]
    LockConflict(#[from] LockConflict),

    /// Entity type not defined by the schema
    #[error("no class \"{type_name}\" in schema")]
    EntityTypeNotFound {
        /// Requested type name
        type_name: String,
    },

    /// Create of an oid that is already live
    #[error("object with oid {oid} already exists")]
    ObjectAlreadyExists {
        /// Conflicting oid
        oid: Oid,
    },

    /// Oid was not allocated for the requested entity type
    #[error("oid {oid} was not allocated for class \"{type_name}\"")]
    OidTypeMismatch {
        /// Supplied oid
        oid: Oid,
        /// Requested type name
        type_name: String,
    },

    /// Unknown project
    #[error("project {project} not found")]
    ProjectNotFound {
        /// Requested project
        project: ProjectId,
    },

    /// Revision is not a committed revision of the project
    #[error("revision {revision} not found in project {project}")]
    RevisionNotFound {
        /// Project
        project: ProjectId,
        /// Requested revision
        revision: RevisionId,
    },

    /// No schema registered under the identifier
    #[error("schema \"{schema}\" not registered")]
    SchemaNotFound {
        /// Requested schema identifier
        schema: String,
    },

    /// Batch exceeds the configured size limit
    #[error("batch of {changes} changes exceeds limit of {limit}")]
    BatchTooLarge {
        /// Number of submitted changes
        changes: usize,
        /// Configured maximum
        limit: usize,
    },

    /// Operation on a concrete revision in the wrong state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Storage layer failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl ChangeError {
    /// Whether retrying on a fresh previous revision may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChangeError::LockConflict(_))
    }

    /// Whether the request itself is invalid
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            ChangeError::LockConflict(_) | ChangeError::InvalidState(_) | ChangeError::Storage(_)
        )
    }
}

/// Errors raised while assembling a schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Attribute declared before any entity type
    #[error("attribute \"{attribute}\" declared outside an entity type")]
    AttributeOutsideEntity {
        /// Attribute name
        attribute: String,
    },

    /// Entity type declared twice
    #[error("duplicate entity type \"{name}\"")]
    DuplicateEntityType {
        /// Type name
        name: String,
    },

    /// Attribute declared twice on one type (shadows included)
    #[error("duplicate attribute \"{attribute}\" in \"{type_name}\"")]
    DuplicateAttribute {
        /// Type name
        type_name: String,
        /// Attribute name
        attribute: String,
    },

    /// Enumeration declared twice
    #[error("duplicate enumeration \"{name}\"")]
    DuplicateEnumeration {
        /// Enumeration name
        name: String,
    },

    /// Attribute uses an undeclared enumeration
    #[error("attribute \"{attribute}\" of \"{type_name}\" uses unknown enumeration \"{enumeration}\"")]
    UnknownEnumeration {
        /// Type name
        type_name: String,
        /// Attribute name
        attribute: String,
        /// Missing enumeration
        enumeration: String,
    },

    /// Reference attribute targets an undeclared type
    #[error("attribute \"{attribute}\" of \"{type_name}\" references unknown type \"{target}\"")]
    UnknownEntityType {
        /// Type name
        type_name: String,
        /// Attribute name
        attribute: String,
        /// Missing target type
        target: String,
    },

    /// More entity types than a type id can address
    #[error("{count} entity types exceed the type id range")]
    TooManyTypes {
        /// Number of declared types
        count: usize,
    },

    /// More attributes than a handle can address
    #[error("entity type \"{type_name}\" has too many attributes")]
    TooManyAttributes {
        /// Type name
        type_name: String,
    },
}
