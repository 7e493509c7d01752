//! Core types and traits for bimstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Oid, TypeId, RevisionId, ConcreteRevisionId, ProjectId: identifiers
//! - RevisionSet: the revisions visible to a read
//! - Value: unified value enum for attribute values
//! - Schema: entity types, attributes, enumerations and shadow links
//! - VirtualObject: schema-typed staging copy of one object
//! - Error: ChangeError, LockConflict, SchemaError
//! - Traits: collaborator traits (SnapshotReader, ObjectWriter)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod object;
pub mod schema;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{ChangeError, ChangeResult, LockConflict, LockConflictKind, SchemaError};
pub use object::{ObjectState, VirtualObject};
pub use schema::{
    Attribute, AttributeHandle, Cardinality, ElementType, EntityType, Enumeration, PrimitiveType,
    Schema, SchemaBuilder, SHADOW_SUFFIX,
};
pub use traits::{ObjectWriter, SnapshotReader};
pub use types::{ConcreteRevisionId, Oid, ProjectId, RevisionId, RevisionSet, TypeId};
pub use value::{render_decimal, EnumLiteral, Value, ValueKind};
