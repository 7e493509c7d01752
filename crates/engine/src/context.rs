//! Change application context
//!
//! A [`ChangeContext`] is the state one batch carries while its changes are
//! applied: the previous revision set it reads from, the concrete revision it
//! writes into, its overlay and its attribute handle cache. Changes reach
//! storage only through the context.
//!
//! ## Target resolution
//!
//! ```text
//! 1. removed earlier in the batch      -> ObjectNotFound
//! 2. staged earlier in the batch       -> staged copy
//! 3. visible in the previous revision  -> snapshot copy
//! 4. created earlier in the batch      -> created copy
//! 5. otherwise                         -> ObjectNotFound
//! ```

use std::sync::Arc;
use tracing::debug;

use bimstore_core::{
    Attribute, AttributeHandle, ChangeError, ChangeResult, ConcreteRevisionId, EntityType,
    ObjectWriter, Oid, ProjectId, RevisionSet, Schema, SnapshotReader, Value, VirtualObject,
};

use crate::change::{ApplyChange, Change};
use crate::coerce::coerce_value;
use crate::overlay::BatchOverlay;
use crate::ownership::OidOwners;
use crate::resolver::HandleCache;

/// Per-batch state threaded through every [`ApplyChange::apply`]
pub struct ChangeContext<'a> {
    schema: &'a Schema,
    reader: &'a dyn SnapshotReader,
    writer: &'a dyn ObjectWriter,
    concrete: ConcreteRevisionId,
    previous: &'a RevisionSet,
    overlay: BatchOverlay,
    handles: HandleCache,
    strict_references: bool,
    owners: Option<(&'a OidOwners, ProjectId)>,
    applied: usize,
}

impl<'a> ChangeContext<'a> {
    /// Context for a batch reading `previous` and writing into `concrete`
    pub fn new(
        schema: &'a Schema,
        reader: &'a dyn SnapshotReader,
        writer: &'a dyn ObjectWriter,
        concrete: ConcreteRevisionId,
        previous: &'a RevisionSet,
    ) -> Self {
        Self {
            schema,
            reader,
            writer,
            concrete,
            previous,
            overlay: BatchOverlay::new(),
            handles: HandleCache::new(),
            strict_references: false,
            owners: None,
            applied: 0,
        }
    }

    /// Require reference targets to be live objects
    pub fn with_strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }

    /// Reject creates under oids owned by a project other than `project`
    pub fn with_owners(mut self, owners: &'a OidOwners, project: ProjectId) -> Self {
        self.owners = Some((owners, project));
        self
    }

    /// Concrete revision receiving the writes
    pub fn concrete(&self) -> ConcreteRevisionId {
        self.concrete
    }

    /// Revisions visible to reads
    pub fn previous(&self) -> &RevisionSet {
        self.previous
    }

    /// Schema the batch is validated against
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Created, staged and deleted objects so far
    pub fn overlay(&self) -> &BatchOverlay {
        &self.overlay
    }

    /// Attribute handle cache
    pub fn handles(&self) -> &HandleCache {
        &self.handles
    }

    /// Number of changes applied successfully
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Apply one change on top of everything applied before it
    pub fn apply(&mut self, change: &Change) -> ChangeResult<()> {
        debug!(
            target: "bimstore::batch",
            concrete = %self.concrete,
            kind = change.kind(),
            oid = %change.target(),
            "applying change"
        );
        change.apply(self)?;
        self.applied += 1;
        Ok(())
    }

    /// Current state of `oid` as seen by this batch
    pub fn resolve_target(&self, oid: Oid) -> ChangeResult<VirtualObject> {
        if self.overlay.is_deleted(oid) {
            return Err(self.object_not_found(oid));
        }
        if let Some(staged) = self.overlay.staged(oid) {
            return Ok(staged.clone());
        }
        if let Some(object) = self.reader.resolve(oid, self.previous) {
            return Ok(object);
        }
        self.overlay
            .created(oid)
            .cloned()
            .ok_or_else(|| self.object_not_found(oid))
    }

    /// Whether `oid` is live as seen by this batch
    pub fn is_live(&self, oid: Oid) -> bool {
        if self.overlay.is_deleted(oid) {
            return false;
        }
        self.overlay.staged(oid).is_some()
            || self.overlay.is_created(oid)
            || self.reader.exists(oid, self.previous)
    }

    /// Whether `oid` belongs to another project
    pub fn is_foreign(&self, oid: Oid) -> bool {
        self.owners
            .map_or(false, |(owners, project)| owners.is_foreign(oid, project))
    }

    /// Entity type by name
    pub fn entity_type(&self, type_name: &str) -> ChangeResult<&'a Arc<EntityType>> {
        let schema: &'a Schema = self.schema;
        schema
            .entity_type_by_name(type_name)
            .ok_or_else(|| ChangeError::EntityTypeNotFound {
                type_name: type_name.to_string(),
            })
    }

    /// Resolve an attribute of `object` through the handle cache
    pub fn resolve_attribute(
        &mut self,
        object: &VirtualObject,
        name: &str,
    ) -> ChangeResult<(AttributeHandle, &'a Attribute)> {
        let schema: &'a Schema = self.schema;
        let handle = self.handles.resolve(schema, object.type_id(), name)?;
        let attribute = schema
            .attribute(handle)
            .ok_or_else(|| ChangeError::AttributeNotFound {
                type_name: object.type_name().to_string(),
                attribute: name.to_string(),
            })?;
        Ok((handle, attribute))
    }

    /// Normalize a caller value for `attribute` and check its references
    pub fn prepare_value(&self, attribute: &Attribute, value: Value) -> ChangeResult<Value> {
        let value = coerce_value(self.schema, attribute, value)?;
        if self.strict_references {
            match &value {
                Value::Ref(target) => self.check_target(*target)?,
                Value::List(items) => {
                    for target in items.iter().filter_map(Value::as_ref_oid) {
                        self.check_target(target)?;
                    }
                }
                _ => {}
            }
        }
        Ok(value)
    }

    /// Fail with `ObjectNotFound` when strict references are on and `target` is not live
    pub fn check_target(&self, target: Oid) -> ChangeResult<()> {
        if !self.strict_references || self.is_live(target) {
            Ok(())
        } else {
            Err(self.object_not_found(target))
        }
    }

    /// Stage a mutated object into the concrete revision
    pub fn persist(&mut self, object: VirtualObject) -> ChangeResult<()> {
        self.writer.persist(&object, self.concrete)?;
        self.overlay.record(object);
        Ok(())
    }

    /// Stage a newly created object into the concrete revision
    pub fn persist_created(&mut self, object: VirtualObject) -> ChangeResult<()> {
        self.writer.persist(&object, self.concrete)?;
        self.overlay.insert_created(object);
        Ok(())
    }

    /// Stage the removal of `oid` into the concrete revision
    pub fn persist_removal(&mut self, oid: Oid) -> ChangeResult<()> {
        self.writer.persist_removal(oid, self.concrete)?;
        self.overlay.remove(oid);
        Ok(())
    }

    /// `ObjectNotFound` naming the type encoded in `oid`
    pub fn object_not_found(&self, oid: Oid) -> ChangeError {
        ChangeError::ObjectNotFound {
            oid,
            expected_type: self
                .schema
                .type_name(oid.type_id())
                .unwrap_or("<unknown>")
                .to_string(),
        }
    }
}

impl std::fmt::Debug for ChangeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeContext")
            .field("schema", &self.schema.id())
            .field("concrete", &self.concrete)
            .field("previous", &self.previous)
            .field("overlay", &self.overlay)
            .field("strict_references", &self.strict_references)
            .field("applied", &self.applied)
            .finish()
    }
}
