//! Shared setup for engine integration tests

#![allow(dead_code)]

use bimstore_engine::{
    Cardinality, Change, Database, ElementType, Oid, PrimitiveType, ProjectId, RevisionInfo,
    Schema, SchemaBuilder,
};

pub const SCHEMA_ID: &str = "ifc2x3tc1";

pub fn schema() -> Schema {
    SchemaBuilder::new(SCHEMA_ID)
        .enumeration("IfcTaskStatus", &["PENDING", "IN_PROGRESS", "COMPLETED"])
        .entity("IfcCartesianPoint")
        .attribute("Coordinates", Cardinality::Many, ElementType::Primitive(PrimitiveType::Float))
        .entity("IfcTask")
        .attribute("Name", Cardinality::Single, ElementType::Primitive(PrimitiveType::String))
        .attribute("Status", Cardinality::Single, ElementType::Enumeration("IfcTaskStatus".into()))
        .attribute("Duration", Cardinality::Single, ElementType::Primitive(PrimitiveType::Float))
        .attribute("Priority", Cardinality::Single, ElementType::Primitive(PrimitiveType::Integer))
        .reference("Predecessors", Cardinality::Many, Some("IfcTask"))
        .build()
        .unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Database with the test schema and one project
pub fn setup() -> (Database, ProjectId) {
    init_tracing();
    let db = Database::new();
    db.register_schema(schema());
    let project = db.create_project("tower", SCHEMA_ID).unwrap();
    (db, project)
}

/// Commit `count` tasks named `T0..` with priority 0
pub fn seed_tasks(db: &Database, project: ProjectId, count: usize) -> (Vec<Oid>, RevisionInfo) {
    let oids: Vec<Oid> = (0..count)
        .map(|_| db.allocate_oid(project, "IfcTask").unwrap())
        .collect();
    let changes: Vec<Change> = oids
        .iter()
        .enumerate()
        .flat_map(|(i, oid)| {
            [
                Change::create_object(*oid, "IfcTask"),
                Change::set_attribute(*oid, "Name", format!("T{}", i)),
                Change::set_attribute(*oid, "Priority", 0i64),
            ]
        })
        .collect();
    let head = db.head(project).unwrap().id;
    let info = db.commit_changes(project, head, &changes, "seed").unwrap();
    (oids, info)
}
