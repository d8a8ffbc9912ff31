mod common;

use std::collections::BTreeSet;

use chrono::Utc;

use rnacentral_xref::counters::CounterPool;
use rnacentral_xref::domain::{CrossReferenceRecord, RecordKey, SubjectId};
use rnacentral_xref::incoming::IncomingSet;
use rnacentral_xref::reconcile::Diff;
use rnacentral_xref::store::{Snapshot, SnapshotStore, SubjectStore};

use common::{PIPELINE, XDB_KEY, key, record};

fn incoming(pairs: &[(&str, i64)]) -> IncomingSet {
    let mut set = IncomingSet::new(PIPELINE, XDB_KEY);
    let mut counters = CounterPool::new();
    for (acc, id) in pairs {
        set.add(acc, SubjectId(*id), Utc::now(), &mut counters);
    }
    set
}

fn keys(records: &[CrossReferenceRecord]) -> BTreeSet<RecordKey> {
    records.iter().map(CrossReferenceRecord::key).collect()
}

#[test]
fn insert_and_match_rebuild_incoming() {
    let set = incoming(&[("URS1", 1), ("URS2", 2), ("URS3", 3)]);
    let resident = vec![record("URS2", 2), record("URS4", 4)];
    let diff = Diff::compute(&set, resident);

    let mut rebuilt = keys(&diff.to_insert);
    rebuilt.extend(keys(&diff.to_match));
    let expected: BTreeSet<RecordKey> = set.records().map(CrossReferenceRecord::key).collect();
    assert_eq!(rebuilt, expected);
    assert!(keys(&diff.to_insert).is_disjoint(&keys(&diff.to_delete)));
    assert_eq!(keys(&diff.to_delete), BTreeSet::from([key("URS4", 4)]));
}

#[test]
fn timestamps_do_not_affect_matching() {
    let mut old = record("URS1", 1);
    old.created_at = chrono::DateTime::<Utc>::from_timestamp(1_500_000_000, 0).unwrap();
    old.modified_at = old.created_at;

    let diff = Diff::compute(&incoming(&[("URS1", 1)]), vec![old.clone()]);
    assert!(diff.to_insert.is_empty());
    assert!(diff.to_delete.is_empty());
    assert_eq!(diff.to_match.len(), 1);
    assert_eq!(diff.to_match[0].created_at, old.created_at);
}

#[test]
fn applying_twice_is_idempotent() {
    let store = SnapshotStore::in_memory(
        Snapshot {
            genes: vec![common::gene(1, "A", 7), common::gene(2, "B", 7)],
            records: vec![record("URS9", 2)],
            ..Snapshot::default()
        },
        20,
    );
    let species = rnacentral_xref::domain::Species {
        name: "frog".to_string(),
        taxon_id: 7,
        searchable: true,
    };
    let set = incoming(&[("URS1", 1), ("URS2", 2)]);

    let resident = store
        .cross_reference_records(&species, PIPELINE, XDB_KEY)
        .unwrap();
    let first = Diff::compute(&set, resident);
    let applied = first.apply(&store).unwrap();
    assert_eq!(applied.inserted, 2);
    assert_eq!(applied.deleted, 1);
    assert_eq!(applied.touched, 0);
    assert_eq!(first.net_yield(), 1);

    let resident = store
        .cross_reference_records(&species, PIPELINE, XDB_KEY)
        .unwrap();
    let second = Diff::compute(&set, resident);
    assert!(second.to_insert.is_empty());
    assert!(second.to_delete.is_empty());
    assert_eq!(second.to_match.len(), 2);
    assert_eq!(second.apply(&store).unwrap().touched, 2);
    assert_eq!(second.net_yield(), 2);
}

#[test]
fn empty_diff_issues_no_batches() {
    let store = SnapshotStore::in_memory(Snapshot::default(), 20);
    let diff = Diff::compute(&incoming(&[]), Vec::new());
    assert!(diff.is_empty());
    let applied = diff.apply(&store).unwrap();
    assert_eq!((applied.inserted, applied.deleted, applied.touched), (0, 0, 0));
}
