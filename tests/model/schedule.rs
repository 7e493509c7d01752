//! Construction Schedule Tests
//!
//! A task network edited over several revisions: enumerations, references
//! and removals as a client application would submit them.

use crate::common::*;

fn status(task: &VirtualObject) -> String {
    match task.get("Status").unwrap() {
        Value::Enum(literal) => literal.literal.clone(),
        other => panic!("expected an enumeration literal, got {:?}", other),
    }
}

/// Test: build a three-task chain, progress it, then drop the middle task
#[test]
fn schedule_progresses_across_revisions() {
    let (db, project) = setup();
    let excavate = db.allocate_oid(project, "IfcTask").unwrap();
    let foundation = db.allocate_oid(project, "IfcTask").unwrap();
    let frame = db.allocate_oid(project, "IfcTask").unwrap();

    let planned = commit(
        &db,
        project,
        &[
            Change::create_object(excavate, "IfcTask"),
            Change::set_attribute(excavate, "Name", "Excavate"),
            Change::set_attribute(excavate, "Status", "notstarted"),
            Change::create_object(foundation, "IfcTask"),
            Change::set_attribute(foundation, "Name", "Foundation"),
            Change::set_attribute(foundation, "Status", "NotStarted"),
            Change::add_reference(foundation, "Predecessors", excavate),
            Change::create_object(frame, "IfcTask"),
            Change::set_attribute(frame, "Name", "Frame"),
            Change::set_attribute(frame, "Milestone", true),
            Change::add_reference(frame, "Predecessors", foundation),
            Change::add_reference(frame, "Predecessors", excavate),
        ],
    );
    assert_eq!(planned.objects_written, 3);

    let started = commit(
        &db,
        project,
        &[
            Change::set_attribute(excavate, "Status", "completed"),
            Change::set_attribute(foundation, "Status", "started"),
            Change::set_attribute(foundation, "Duration", 12.0),
        ],
    );

    assert_eq!(status(&read(&db, project, excavate)), "COMPLETED");
    let foundation_now = read(&db, project, foundation);
    assert_eq!(status(&foundation_now), "STARTED");
    assert_eq!(
        foundation_now.get("DurationAsString").unwrap(),
        &Value::String("12.0".into())
    );

    // Drop the middle task and the reference pointing at it
    let pruned = commit(
        &db,
        project,
        &[
            Change::remove_reference(frame, "Predecessors", 0),
            Change::remove_object(foundation),
        ],
    );
    assert_eq!(pruned.objects_removed, 1);

    let frame_now = read(&db, project, frame);
    assert_eq!(
        frame_now.get("Predecessors").unwrap(),
        &Value::List(vec![Value::Ref(excavate)])
    );
    let tasks = db.objects_of_type(project, pruned.id, "IfcTask").unwrap();
    assert_eq!(
        tasks.iter().map(|t| t.oid()).collect::<Vec<_>>(),
        vec![excavate, frame]
    );

    // Earlier revisions are untouched
    let at_start = db.read_object(project, started.id, foundation).unwrap().unwrap();
    assert_eq!(status(&at_start), "STARTED");
    let at_plan = db.read_object(project, planned.id, excavate).unwrap().unwrap();
    assert_eq!(status(&at_plan), "NOTSTARTED");
    assert_eq!(db.revisions(project).unwrap().len(), 4);
}

/// Test: an unknown status literal rejects the batch and names the literal
#[test]
fn unknown_status_literal_rejected() {
    let (db, project) = setup();
    let task = db.allocate_oid(project, "IfcTask").unwrap();
    commit(&db, project, &[Change::create_object(task, "IfcTask")]);

    let head = db.head(project).unwrap().id;
    let err = db
        .commit_changes(
            project,
            head,
            &[Change::set_attribute(task, "Status", "not_a_literal")],
            "bad",
        )
        .unwrap_err();
    assert_eq!(
        err,
        ChangeError::InvalidEnumLiteral {
            attribute: "Status".into(),
            literal: "not_a_literal".into()
        }
    );
    assert!(err.is_caller_error());
    assert_eq!(db.head(project).unwrap().id, head);
}

/// Test: a typed reference rejects targets of another class
#[test]
fn predecessor_must_be_a_task() {
    let (db, project) = setup();
    let task = db.allocate_oid(project, "IfcTask").unwrap();
    let wall = db.allocate_oid(project, "IfcWall").unwrap();
    commit(
        &db,
        project,
        &[
            Change::create_object(task, "IfcTask"),
            Change::create_object(wall, "IfcWall"),
        ],
    );

    let head = db.head(project).unwrap().id;
    let err = db
        .commit_changes(
            project,
            head,
            &[Change::add_reference(task, "Predecessors", wall)],
            "wrong class",
        )
        .unwrap_err();
    assert!(matches!(err, ChangeError::TypeMismatch { .. }), "got {:?}", err);

    // Untyped references take any class
    let info = commit(&db, project, &[Change::add_reference(task, "Relates", wall)]);
    let task_now = db.read_object(project, info.id, task).unwrap().unwrap();
    assert_eq!(task_now.get("Relates").unwrap(), &Value::List(vec![Value::Ref(wall)]));
}

/// Test: creating the same object twice fails
#[test]
fn duplicate_create_rejected() {
    let (db, project) = setup();
    let task = db.allocate_oid(project, "IfcTask").unwrap();
    commit(&db, project, &[Change::create_object(task, "IfcTask")]);

    let head = db.head(project).unwrap().id;
    let err = db
        .commit_changes(project, head, &[Change::create_object(task, "IfcTask")], "again")
        .unwrap_err();
    assert_eq!(err, ChangeError::ObjectAlreadyExists { oid: task });
}
