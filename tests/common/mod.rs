//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::Once;

pub use bimstore::{
    Cardinality, Change, ChangeError, Database, ElementType, Oid, PrimitiveType, ProjectId,
    RevisionInfo, Schema, SchemaBuilder, Value, VirtualObject,
};

pub const SCHEMA_ID: &str = "ifc2x3tc1";

static INIT_TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Small slice of an IFC 2x3 schema: geometry, schedule and building elements
pub fn ifc_schema() -> Schema {
    SchemaBuilder::new(SCHEMA_ID)
        .enumeration("IfcTaskStatus", &["NOTSTARTED", "STARTED", "COMPLETED"])
        .enumeration("IfcWallTypeEnum", &["STANDARD", "POLYGONAL", "SHEAR", "NOTDEFINED"])
        .entity("IfcCartesianPoint")
        .attribute("Coordinates", Cardinality::Many, ElementType::Primitive(PrimitiveType::Float))
        .entity("IfcPolyline")
        .reference("Points", Cardinality::Many, Some("IfcCartesianPoint"))
        .entity("IfcWall")
        .attribute("Name", Cardinality::Single, ElementType::Primitive(PrimitiveType::String))
        .attribute("PredefinedType", Cardinality::Single, ElementType::Enumeration("IfcWallTypeEnum".into()))
        .attribute("Height", Cardinality::Single, ElementType::Primitive(PrimitiveType::Float))
        .reference("Axis", Cardinality::Single, Some("IfcPolyline"))
        .entity("IfcTask")
        .attribute("Name", Cardinality::Single, ElementType::Primitive(PrimitiveType::String))
        .attribute("Status", Cardinality::Single, ElementType::Enumeration("IfcTaskStatus".into()))
        .attribute("Duration", Cardinality::Single, ElementType::Primitive(PrimitiveType::Float))
        .attribute("Milestone", Cardinality::Single, ElementType::Primitive(PrimitiveType::Boolean))
        .reference("Predecessors", Cardinality::Many, Some("IfcTask"))
        .reference("Relates", Cardinality::Many, None)
        .build()
        .unwrap()
}

/// Database with the IFC schema registered and one project
pub fn setup() -> (Database, ProjectId) {
    init_tracing();
    let db = Database::new();
    db.register_schema(ifc_schema());
    let project = db.create_project("tower", SCHEMA_ID).unwrap();
    (db, project)
}

/// Commit `changes` on the project head
pub fn commit(db: &Database, project: ProjectId, changes: &[Change]) -> RevisionInfo {
    let head = db.head(project).unwrap().id;
    db.commit_changes(project, head, changes, "test").unwrap()
}

/// Object as of the project head
pub fn read(db: &Database, project: ProjectId, oid: Oid) -> VirtualObject {
    let head = db.head(project).unwrap().id;
    db.read_object(project, head, oid).unwrap().unwrap()
}

pub fn floats(values: &[f64]) -> Value {
    Value::List(values.iter().map(|v| Value::Float(*v)).collect())
}

pub fn texts(values: &[&str]) -> Value {
    Value::List(values.iter().map(|v| Value::String(v.to_string())).collect())
}
