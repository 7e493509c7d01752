//! bimstore - revisioned object-model server core for BIM projects
//!
//! bimstore keeps every object of an IFC project in an immutable, linear
//! history of revisions. Clients submit batches of changes against a
//! previous revision; a batch is validated against the project's schema and
//! committed all-or-nothing as the next revision.
//!
//! # Quick Start
//!
//! ```ignore
//! use bimstore::{Change, Database, SchemaBuilder};
//!
//! let db = Database::new();
//! db.register_schema(schema);
//! let project = db.create_project("tower", "ifc2x3tc1")?;
//!
//! let head = db.head(project)?.id;
//! let wall = db.allocate_oid(project, "IfcWall")?;
//! let info = db.commit_changes(
//!     project,
//!     head,
//!     &[Change::create_object(wall, "IfcWall"), Change::set_attribute(wall, "Name", "W-01")],
//!     "add wall",
//! )?;
//!
//! let wall = db.read_object(project, info.id, wall)?;
//! ```
//!
//! # Architecture
//!
//! - `bimstore-core`: identifiers, values, schemas, virtual objects, errors
//! - `bimstore-storage`: in-memory multi-version object store
//! - `bimstore-concurrency`: concrete revisions, object locks, commit
//! - `bimstore-engine`: change application and the [`Database`] facade

pub use bimstore_engine::*;

/// Storage layer, for callers that read the store directly
pub mod storage {
    pub use bimstore_storage::{ObjectStore, StoreReader, StoredObject};
}

/// Concurrency layer, for callers driving concrete revisions themselves
pub mod concurrency {
    pub use bimstore_concurrency::{CommitError, CommitOutcome, PendingOperations, RevisionManager};
}
