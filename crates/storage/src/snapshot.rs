//! Schema-bound snapshot reader
//!
//! `StoreReader` materializes stored object states as `VirtualObject`s under
//! one schema. It holds only `Arc`s, so it is cheap to clone and can be
//! shared by every batch of a project.
//!
//! # Design Notes
//!
//! - **Side-effect free**: reads never touch the store's counters or chains
//! - **Revision scoped**: every read names the revision set it may see
//! - **Schema checked**: a stored state that does not fit its entity type is
//!   reported and treated as absent

use std::sync::Arc;
use tracing::error;

use bimstore_core::{ChangeError, ChangeResult, Oid, RevisionSet, Schema, SnapshotReader, VirtualObject};

use crate::sharded::ObjectStore;

/// Snapshot reader over an [`ObjectStore`] for one schema
#[derive(Debug, Clone)]
pub struct StoreReader {
    store: Arc<ObjectStore>,
    schema: Arc<Schema>,
}

impl StoreReader {
    /// Create a reader materializing objects under `schema`
    pub fn new(store: Arc<ObjectStore>, schema: Arc<Schema>) -> Self {
        Self { store, schema }
    }

    /// Schema objects are materialized under
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// Live objects of one entity type, sorted by oid
    pub fn objects_of_type(
        &self,
        type_name: &str,
        revisions: &RevisionSet,
    ) -> ChangeResult<Vec<VirtualObject>> {
        let entity = self
            .schema
            .entity_type_by_name(type_name)
            .ok_or_else(|| ChangeError::EntityTypeNotFound {
                type_name: type_name.to_string(),
            })?;
        Ok(self
            .store
            .list_by_type(entity.id(), revisions)
            .iter()
            .filter_map(|state| self.materialize(state.oid, state))
            .collect())
    }

    fn materialize(&self, oid: Oid, state: &bimstore_core::ObjectState) -> Option<VirtualObject> {
        let Some(entity) = self.schema.entity_type(oid.type_id()) else {
            error!(
                target: "bimstore::batch",
                %oid, schema = self.schema.id(),
                "stored object has a type id unknown to the schema"
            );
            return None;
        };
        let object = VirtualObject::from_state(Arc::clone(entity), state);
        if object.is_none() {
            error!(
                target: "bimstore::batch",
                %oid, type_name = entity.name(),
                "stored object does not fit its entity type"
            );
        }
        object
    }
}

impl SnapshotReader for StoreReader {
    fn resolve(&self, oid: Oid, revisions: &RevisionSet) -> Option<VirtualObject> {
        let state = self.store.get_visible(oid, revisions)?;
        self.materialize(oid, &state)
    }

    fn exists(&self, oid: Oid, revisions: &RevisionSet) -> bool {
        self.store.get_visible(oid, revisions).is_some()
    }
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::StoreReader: Send, Sync);
    use super::*;
    use bimstore_core::{
        Cardinality, ElementType, ObjectState, PrimitiveType, RevisionId, SchemaBuilder, TypeId,
        Value,
    };

    fn schema() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("test")
                .entity("IfcWall")
                .attribute("Name", Cardinality::Single, ElementType::Primitive(PrimitiveType::String))
                .attribute("Height", Cardinality::Single, ElementType::Primitive(PrimitiveType::Float))
                .build()
                .unwrap(),
        )
    }

    fn wall_state(oid: Oid, name: &str) -> Arc<ObjectState> {
        Arc::new(ObjectState {
            oid,
            values: vec![Value::from(name), Value::Null, Value::Null],
        })
    }

    // ========================================
    // Resolve
    // ========================================

    #[test]
    fn test_resolve_materializes_under_schema() {
        let store = Arc::new(ObjectStore::new());
        let reader = StoreReader::new(Arc::clone(&store), schema());
        let oid = Oid::new(TypeId(0), 1);
        store.apply_batch(&[(oid, Some(wall_state(oid, "north")))], RevisionId(1)).unwrap();

        let object = reader.resolve(oid, &RevisionSet::single(RevisionId(1))).unwrap();
        assert_eq!(object.type_name(), "IfcWall");
        assert_eq!(object.get("Name").unwrap(), &Value::from("north"));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let store = Arc::new(ObjectStore::new());
        let reader = StoreReader::new(Arc::clone(&store), schema());
        let oid = Oid::new(TypeId(0), 1);
        store.apply_batch(&[(oid, Some(wall_state(oid, "north")))], RevisionId(1)).unwrap();
        let revisions = RevisionSet::single(RevisionId(1));

        let first = reader.resolve(oid, &revisions).unwrap();
        let second = reader.resolve(oid, &revisions).unwrap();
        assert_eq!(first.to_state(), second.to_state());
        assert_eq!(store.version(), RevisionId(1));
    }

    #[test]
    fn test_resolve_absent() {
        let reader = StoreReader::new(Arc::new(ObjectStore::new()), schema());
        let oid = Oid::new(TypeId(0), 1);
        assert!(reader.resolve(oid, &RevisionSet::single(RevisionId(1))).is_none());
        assert!(!reader.exists(oid, &RevisionSet::single(RevisionId(1))));
    }

    #[test]
    fn test_resolve_rejects_state_of_wrong_shape() {
        let store = Arc::new(ObjectStore::new());
        let reader = StoreReader::new(Arc::clone(&store), schema());
        let oid = Oid::new(TypeId(0), 1);
        let broken = Arc::new(ObjectState {
            oid,
            values: vec![Value::from("only one slot")],
        });
        store.apply_batch(&[(oid, Some(broken))], RevisionId(1)).unwrap();
        assert!(reader.resolve(oid, &RevisionSet::single(RevisionId(1))).is_none());
    }

    #[test]
    fn test_resolve_unknown_type_id() {
        let store = Arc::new(ObjectStore::new());
        let reader = StoreReader::new(Arc::clone(&store), schema());
        let oid = Oid::new(TypeId(9), 1);
        store.apply_batch(&[(oid, Some(wall_state(oid, "x")))], RevisionId(1)).unwrap();
        assert!(reader.resolve(oid, &RevisionSet::single(RevisionId(1))).is_none());
    }

    // ========================================
    // Type Scan
    // ========================================

    #[test]
    fn test_objects_of_type() {
        let store = Arc::new(ObjectStore::new());
        let reader = StoreReader::new(Arc::clone(&store), schema());
        let a = Oid::new(TypeId(0), 1);
        let b = Oid::new(TypeId(0), 2);
        store
            .apply_batch(
                &[(b, Some(wall_state(b, "b"))), (a, Some(wall_state(a, "a")))],
                RevisionId(1),
            )
            .unwrap();

        let walls = reader
            .objects_of_type("IfcWall", &RevisionSet::single(RevisionId(1)))
            .unwrap();
        let oids: Vec<_> = walls.iter().map(VirtualObject::oid).collect();
        assert_eq!(oids, vec![a, b]);
    }

    #[test]
    fn test_objects_of_unknown_type() {
        let reader = StoreReader::new(Arc::new(ObjectStore::new()), schema());
        let err = reader
            .objects_of_type("IfcDoor", &RevisionSet::single(RevisionId(1)))
            .unwrap_err();
        assert!(matches!(err, ChangeError::EntityTypeNotFound { .. }));
    }
}
