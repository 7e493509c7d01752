//! Geometry Tests
//!
//! Float lists and their string shadows through whole batches, including
//! property tests over arbitrary coordinate edits.

use crate::common::*;
use bimstore::render_decimal;
use proptest::prelude::*;

fn assert_shadow_mirrors(point: &VirtualObject) {
    let (Value::List(values), Value::List(shadow)) = (
        point.get("Coordinates").unwrap(),
        point.get("CoordinatesAsString").unwrap(),
    ) else {
        panic!("coordinates and shadow must both be lists");
    };
    assert_eq!(values.len(), shadow.len());
    for (value, text) in values.iter().zip(shadow) {
        let Value::Float(f) = value else {
            panic!("coordinate {:?} is not a float", value);
        };
        assert_eq!(text, &Value::String(render_decimal(*f)));
    }
}

/// Test: a polyline of points, then one point moved
#[test]
fn polyline_points_and_shadows() {
    let (db, project) = setup();
    let line = db.allocate_oid(project, "IfcPolyline").unwrap();
    let a = db.allocate_oid(project, "IfcCartesianPoint").unwrap();
    let b = db.allocate_oid(project, "IfcCartesianPoint").unwrap();

    commit(
        &db,
        project,
        &[
            Change::create_object(a, "IfcCartesianPoint"),
            Change::set_attribute_at_index(a, "Coordinates", 0, floats(&[0.0, 0.0, 0.0])),
            Change::create_object(b, "IfcCartesianPoint"),
            Change::set_attribute_at_index(b, "Coordinates", 0, floats(&[4.5, 0.0, 0.0])),
            Change::create_object(line, "IfcPolyline"),
            Change::set_attribute(line, "Points", Value::List(vec![Value::Ref(a), Value::Ref(b)])),
        ],
    );

    let moved = commit(
        &db,
        project,
        &[Change::set_attribute(b, "Coordinates", floats(&[4.25, 1.0]))],
    );

    let b_now = db.read_object(project, moved.id, b).unwrap().unwrap();
    assert_eq!(b_now.get("CoordinatesAsString").unwrap(), &texts(&["4.25", "1.0"]));
    assert_shadow_mirrors(&b_now);
    assert_shadow_mirrors(&read(&db, project, a));
}

/// Test: a scalar against the coordinate list is rejected
#[test]
fn scalar_against_list_rejected() {
    let (db, project) = setup();
    let point = db.allocate_oid(project, "IfcCartesianPoint").unwrap();
    commit(
        &db,
        project,
        &[
            Change::create_object(point, "IfcCartesianPoint"),
            Change::set_attribute(point, "Coordinates", floats(&[1.0, 2.0])),
        ],
    );

    let head = db.head(project).unwrap().id;
    let err = db
        .commit_changes(
            project,
            head,
            &[Change::set_attribute_at_index(point, "Coordinates", 1, 9.0)],
            "scalar",
        )
        .unwrap_err();
    assert!(matches!(err, ChangeError::CardinalityMismatch { got_many: false, .. }));
    assert_eq!(read(&db, project, point).get("Coordinates").unwrap(), &floats(&[1.0, 2.0]));
}

/// Test: a sequence against a scalar attribute is rejected
#[test]
fn sequence_against_scalar_rejected() {
    let (db, project) = setup();
    let wall = db.allocate_oid(project, "IfcWall").unwrap();
    commit(
        &db,
        project,
        &[
            Change::create_object(wall, "IfcWall"),
            Change::set_attribute(wall, "Height", 3.0),
        ],
    );

    let head = db.head(project).unwrap().id;
    let err = db
        .commit_changes(
            project,
            head,
            &[Change::set_attribute_at_index(wall, "Height", 0, floats(&[3.5, 4.0]))],
            "sequence",
        )
        .unwrap_err();
    assert!(matches!(err, ChangeError::CardinalityMismatch { got_many: true, .. }));

    let wall_now = read(&db, project, wall);
    assert_eq!(wall_now.get("Height").unwrap(), &Value::Float(3.0));
    assert_eq!(wall_now.get("HeightAsString").unwrap(), &Value::String("3.0".into()));
}

fn coordinates() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e6f64..1.0e6, 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every committed revision keeps the shadow list in step
    #[test]
    fn shadow_in_step_at_every_revision(edits in prop::collection::vec(coordinates(), 1..5)) {
        let (db, project) = setup();
        let point = db.allocate_oid(project, "IfcCartesianPoint").unwrap();
        commit(&db, project, &[Change::create_object(point, "IfcCartesianPoint")]);

        let mut revisions = Vec::new();
        for edit in &edits {
            let info = commit(&db, project, &[Change::set_attribute(point, "Coordinates", floats(edit))]);
            revisions.push(info.id);
        }

        for (revision, edit) in revisions.iter().zip(&edits) {
            let state = db.read_object(project, *revision, point).unwrap().unwrap();
            prop_assert_eq!(state.get("Coordinates").unwrap(), &floats(edit));
            assert_shadow_mirrors(&state);
        }
    }

    /// A batch whose last change fails leaves the point as it was
    #[test]
    fn failing_batch_leaves_point_unchanged(
        before in coordinates(),
        after in coordinates(),
    ) {
        let (db, project) = setup();
        let point = db.allocate_oid(project, "IfcCartesianPoint").unwrap();
        let seeded = commit(
            &db,
            project,
            &[
                Change::create_object(point, "IfcCartesianPoint"),
                Change::set_attribute(point, "Coordinates", floats(&before)),
            ],
        );

        let result = db.commit_changes(
            project,
            seeded.id,
            &[
                Change::set_attribute(point, "Coordinates", floats(&after)),
                Change::set_attribute(point, "Colour", "red"),
            ],
            "fails last",
        );
        let is_attribute_not_found = matches!(result, Err(ChangeError::AttributeNotFound { .. }));
        prop_assert!(is_attribute_not_found);
        prop_assert_eq!(db.head(project).unwrap().id, seeded.id);
        let state = read(&db, project, point);
        prop_assert_eq!(state.get("Coordinates").unwrap(), &floats(&before));
        assert_shadow_mirrors(&state);
    }
}
