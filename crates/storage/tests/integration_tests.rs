//! Integration tests for the storage layer
//!
//! These tests verify that ObjectStore and StoreReader work together:
//! - Revision-scoped reads under concurrent writers
//! - Tombstones and re-reads across revision sets
//! - Visible state matches a simple model for arbitrary batch sequences

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use bimstore_core::{
    Cardinality, ElementType, ObjectState, Oid, PrimitiveType, RevisionId, RevisionSet, Schema,
    SchemaBuilder, SnapshotReader, TypeId, Value,
};
use bimstore_storage::{ObjectStore, StoreReader};

// ============================================================================
// Helper Functions
// ============================================================================

fn schema() -> Arc<Schema> {
    Arc::new(
        SchemaBuilder::new("test")
            .entity("IfcSpace")
            .attribute("LongName", Cardinality::Single, ElementType::Primitive(PrimitiveType::String))
            .build()
            .unwrap(),
    )
}

fn space(oid: Oid, name: &str) -> Option<Arc<ObjectState>> {
    Some(Arc::new(ObjectState {
        oid,
        values: vec![Value::from(name)],
    }))
}

fn up_to(revision: u64) -> RevisionSet {
    (1..=revision).map(RevisionId).collect()
}

// ============================================================================
// Revision Scoped Reads
// ============================================================================

mod revision_reads {
    use super::*;

    #[test]
    fn test_reader_sees_only_published_revisions() {
        let store = Arc::new(ObjectStore::new());
        let reader = StoreReader::new(Arc::clone(&store), schema());
        let oid = store.allocate_oid(TypeId(0)).unwrap();

        let r1 = store.next_revision();
        store.apply_batch(&[(oid, space(oid, "Lobby"))], r1).unwrap();
        let r2 = store.next_revision();
        store.apply_batch(&[(oid, space(oid, "Foyer"))], r2).unwrap();

        let old = reader.resolve(oid, &RevisionSet::single(r1)).unwrap();
        assert_eq!(old.get("LongName").unwrap(), &Value::from("Lobby"));
        let new = reader.resolve(oid, &up_to(r2.as_u64())).unwrap();
        assert_eq!(new.get("LongName").unwrap(), &Value::from("Foyer"));
    }

    #[test]
    fn test_removed_object_reappears_in_older_view() {
        let store = Arc::new(ObjectStore::new());
        let reader = StoreReader::new(Arc::clone(&store), schema());
        let oid = store.allocate_oid(TypeId(0)).unwrap();

        let r1 = store.next_revision();
        store.apply_batch(&[(oid, space(oid, "Lobby"))], r1).unwrap();
        let r2 = store.next_revision();
        store.apply_batch(&[(oid, None)], r2).unwrap();

        assert!(reader.resolve(oid, &up_to(2)).is_none());
        assert!(reader.resolve(oid, &up_to(1)).is_some());
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let store = Arc::new(ObjectStore::new());
        let reader = StoreReader::new(Arc::clone(&store), schema());
        let oid = store.allocate_oid(TypeId(0)).unwrap();
        let r1 = store.next_revision();
        store.apply_batch(&[(oid, space(oid, "v1"))], r1).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    let revision = store.next_revision();
                    store
                        .apply_batch(&[(oid, space(oid, &format!("v{}", i + 2)))], revision)
                        .unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reader = reader.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let object = reader.resolve(oid, &RevisionSet::single(r1)).unwrap();
                        assert_eq!(object.get("LongName").unwrap(), &Value::from("v1"));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(store.history(oid, None).len(), 101);
    }
}

// ============================================================================
// Model Check
// ============================================================================

proptest! {
    #[test]
    fn prop_visible_state_matches_model(
        batches in proptest::collection::vec(
            proptest::collection::vec((1u64..6, proptest::option::of("[a-z]{1,4}")), 1..5),
            1..12,
        ),
    ) {
        let store = ObjectStore::new();
        // oid counter -> (revision, name or removal)
        let mut model: BTreeMap<u64, Vec<(u64, Option<String>)>> = BTreeMap::new();

        for batch in &batches {
            let revision = store.next_revision();
            let mut writes = BTreeMap::new();
            for (counter, name) in batch {
                writes.insert(*counter, name.clone());
            }
            let entries: Vec<_> = writes
                .iter()
                .map(|(counter, name)| {
                    let oid = Oid::new(TypeId(0), *counter);
                    (oid, name.as_deref().and_then(|n| space(oid, n)))
                })
                .collect();
            store.apply_batch(&entries, revision).unwrap();
            for (counter, name) in writes {
                model.entry(counter).or_default().push((revision.as_u64(), name));
            }
        }

        let latest = store.version().as_u64();
        for horizon in 1..=latest {
            let revisions = up_to(horizon);
            for counter in 1u64..6 {
                let expected = model
                    .get(&counter)
                    .and_then(|versions| versions.iter().rev().find(|(r, _)| *r <= horizon))
                    .and_then(|(_, name)| name.clone());
                let actual = store
                    .get_visible(Oid::new(TypeId(0), counter), &revisions)
                    .and_then(|state| state.values[0].as_str().map(str::to_string));
                prop_assert_eq!(actual, expected);
            }
        }
    }
}
