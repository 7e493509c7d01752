//! Transport Shape Tests
//!
//! Batches arrive as serde data; a JSON batch decodes into changes that
//! commit like hand-built ones.

use crate::common::*;
use serde_json::json;

/// Test: a JSON batch creates and names a wall
#[test]
fn json_batch_commits() {
    let (db, project) = setup();
    let wall = db.allocate_oid(project, "IfcWall").unwrap();

    let payload = json!([
        { "kind": "CreateObject", "oid": wall.as_u64(), "type_name": "IfcWall" },
        { "kind": "SetAttribute", "oid": wall.as_u64(), "attribute": "Name",
          "value": { "String": "W-01" } },
        { "kind": "SetAttributeAtIndex", "oid": wall.as_u64(), "attribute": "PredefinedType",
          "index": 0, "value": { "String": "shear" } },
        { "kind": "SetAttributeAtIndex", "oid": wall.as_u64(), "attribute": "Height",
          "index": 0, "value": { "Float": 2.75 } }
    ]);
    let changes: Vec<Change> = serde_json::from_value(payload).unwrap();
    assert_eq!(changes.len(), 4);

    let info = commit(&db, project, &changes);
    let wall_now = db.read_object(project, info.id, wall).unwrap().unwrap();
    assert_eq!(wall_now.get("Name").unwrap(), &Value::String("W-01".into()));
    assert!(matches!(
        wall_now.get("PredefinedType").unwrap(),
        Value::Enum(literal) if literal.literal == "SHEAR"
    ));
    assert_eq!(wall_now.get("HeightAsString").unwrap(), &Value::String("2.75".into()));

    let record = serde_json::to_value(&info).unwrap();
    assert_eq!(record["changes"], 4);
    assert_eq!(record["comment"], "test");
}

/// Test: an index out of range on a scalar is reported with its slot count
#[test]
fn json_index_out_of_range() {
    let (db, project) = setup();
    let wall = db.allocate_oid(project, "IfcWall").unwrap();
    commit(&db, project, &[Change::create_object(wall, "IfcWall")]);

    let change: Change = serde_json::from_value(json!({
        "kind": "SetAttributeAtIndex", "oid": wall.as_u64(), "attribute": "Name",
        "index": 3, "value": { "String": "W-02" }
    }))
    .unwrap();

    let head = db.head(project).unwrap().id;
    let err = db.commit_changes(project, head, &[change], "oob").unwrap_err();
    assert_eq!(
        err,
        ChangeError::IndexOutOfRange {
            attribute: "Name".into(),
            index: 3,
            current_length: 1
        }
    );
}
