//! Change engine for bimstore
//!
//! This crate orchestrates all lower layers:
//! - Change: the closed set of change variants and their application
//! - ChangeContext: per-batch overlay, handle cache and target resolution
//! - BatchCoordinator: concrete revision lifecycle and batch metrics
//! - Database: projects, schemas, batches and revisioned reads
//!
//! The engine is the only component that knows about:
//! - Batches (all-or-nothing application of ordered changes)
//! - Projects and their revision history
//! - Caller-side retry of lock conflicts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod coerce;
pub mod context;
pub mod coordinator;
pub mod database;
pub mod overlay;
pub mod ownership;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use change::{
    AddReference, ApplyChange, Change, CreateObject, RemoveObject, RemoveReference, SetAttribute,
    SetAttributeAtIndex, SetReference,
};
pub use coerce::coerce_value;
pub use context::ChangeContext;
pub use coordinator::{BatchCoordinator, BatchMetrics};
pub use database::{
    ConfigError, Database, EngineConfig, Project, RetryConfig, RetrySettings, RevisionInfo,
    SchemaRegistry, CONFIG_FILE_NAME,
};
pub use overlay::BatchOverlay;
pub use ownership::OidOwners;
pub use resolver::HandleCache;

pub use bimstore_core::{
    render_decimal, Cardinality, ChangeError, ChangeResult, ConcreteRevisionId, ElementType,
    EnumLiteral, LockConflict, LockConflictKind, Oid, PrimitiveType, ProjectId, RevisionId,
    RevisionSet, Schema, SchemaBuilder, TypeId, Value, VirtualObject,
};
