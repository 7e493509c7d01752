//! Shared fixture for engine unit tests

use std::sync::Arc;

use bimstore_concurrency::RevisionManager;
use bimstore_core::{
    Cardinality, ConcreteRevisionId, ElementType, ObjectWriter, Oid, PrimitiveType, ProjectId,
    RevisionId, RevisionSet, Schema, SchemaBuilder, SnapshotReader, Value, VirtualObject,
};
use bimstore_storage::{ObjectStore, StoreReader};

use crate::context::ChangeContext;

pub(crate) fn schema() -> Schema {
    SchemaBuilder::new("ifc2x3tc1")
        .enumeration("IfcTaskStatus", &["PENDING", "IN_PROGRESS", "COMPLETED"])
        .entity("IfcCartesianPoint")
        .attribute("Coordinates", Cardinality::Many, ElementType::Primitive(PrimitiveType::Float))
        .entity("IfcTask")
        .attribute("Name", Cardinality::Single, ElementType::Primitive(PrimitiveType::String))
        .attribute("Status", Cardinality::Single, ElementType::Enumeration("IfcTaskStatus".into()))
        .attribute("Duration", Cardinality::Single, ElementType::Primitive(PrimitiveType::Float))
        .attribute("Priority", Cardinality::Single, ElementType::Primitive(PrimitiveType::Integer))
        .attribute("Tags", Cardinality::Many, ElementType::Primitive(PrimitiveType::String))
        .reference("Predecessors", Cardinality::Many, Some("IfcTask"))
        .reference("Owner", Cardinality::Single, None)
        .entity("IfcWall")
        .attribute("Name", Cardinality::Single, ElementType::Primitive(PrimitiveType::String))
        .build()
        .unwrap()
}

pub(crate) struct Fixture {
    pub schema: Arc<Schema>,
    pub store: Arc<ObjectStore>,
    pub manager: RevisionManager,
    pub reader: StoreReader,
    pub previous: RevisionSet,
}

impl Fixture {
    pub fn new() -> Self {
        let schema = Arc::new(schema());
        let store = Arc::new(ObjectStore::new());
        Self {
            manager: RevisionManager::new(Arc::clone(&store)),
            reader: StoreReader::new(Arc::clone(&store), Arc::clone(&schema)),
            schema,
            store,
            previous: RevisionSet::new(),
        }
    }

    /// Fresh object of `type_name` with an allocated oid
    pub fn object(&self, type_name: &str) -> VirtualObject {
        let entity = Arc::clone(self.schema.entity_type_by_name(type_name).unwrap());
        let oid = self.store.allocate_oid(entity.id()).unwrap();
        VirtualObject::new(oid, entity)
    }

    pub fn oid(&self, type_name: &str) -> Oid {
        let type_id = self.schema.entity_type_by_name(type_name).unwrap().id();
        self.store.allocate_oid(type_id).unwrap()
    }

    /// Commit `objects` as one revision and make it visible
    pub fn seed(&mut self, objects: &[VirtualObject]) -> RevisionId {
        let concrete = self.begin();
        for object in objects {
            self.manager.persist(object, concrete).unwrap();
        }
        let outcome = self.manager.commit(concrete, |_| {}).unwrap();
        self.previous.insert(outcome.revision);
        outcome.revision
    }

    pub fn begin(&self) -> ConcreteRevisionId {
        self.manager.begin(ProjectId(1), self.store.version())
    }

    pub fn context(&self, concrete: ConcreteRevisionId) -> ChangeContext<'_> {
        ChangeContext::new(&self.schema, &self.reader, &self.manager, concrete, &self.previous)
    }

    /// Committed state of `oid` visible to the fixture's previous set
    pub fn committed(&self, oid: Oid) -> Option<VirtualObject> {
        self.reader.resolve(oid, &self.previous)
    }
}

pub(crate) fn floats(values: &[f64]) -> Value {
    Value::List(values.iter().map(|v| Value::Float(*v)).collect())
}
