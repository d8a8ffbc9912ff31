mod common;

use camino::Utf8PathBuf;

use rnacentral_xref::domain::{Species, SubjectId};
use rnacentral_xref::error::XrefError;
use rnacentral_xref::store::{GeneXref, Snapshot, SnapshotStore, SubjectStore};

use common::{PIPELINE, XDB_KEY, gene, key, record, transcript};

fn rat() -> Species {
    Species {
        name: "rat".to_string(),
        taxon_id: 10116,
        searchable: true,
    }
}

#[test]
fn writes_survive_reopen() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("store.json")).unwrap();
    let snapshot = Snapshot {
        genes: vec![gene(1, "Mir21", 10116), gene(2, "Xact", 9606)],
        transcripts: vec![transcript(100, 1, "NR_1")],
        ..Snapshot::default()
    };
    std::fs::write(path.as_std_path(), serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let store = SnapshotStore::open(&path, 20).unwrap();
    assert_eq!(
        store
            .insert_records(&[record("URS1", 1), record("URS2", 2)])
            .unwrap(),
        2
    );
    drop(store);

    let reopened = SnapshotStore::open(&path, 20).unwrap();
    let rat_records = reopened
        .cross_reference_records(&rat(), PIPELINE, XDB_KEY)
        .unwrap();
    assert_eq!(rat_records.len(), 1);
    assert_eq!(rat_records[0].key(), key("URS1", 1));

    assert_eq!(reopened.delete_records(&[record("URS1", 1)]).unwrap(), 1);
    assert_eq!(reopened.delete_records(&[record("URS1", 1)]).unwrap(), 0);
}

#[test]
fn missing_snapshot_starts_empty() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("new").join("store.json")).unwrap();
    let store = SnapshotStore::open(&path, 20).unwrap();
    assert!(store.snapshot().unwrap().records.is_empty());

    store.insert_records(&[record("URS1", 1)]).unwrap();
    assert!(path.as_std_path().exists());
}

#[test]
fn corrupt_snapshot_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("store.json")).unwrap();
    std::fs::write(path.as_std_path(), b"{ not json").unwrap();
    let err = SnapshotStore::open(&path, 20).unwrap_err();
    assert!(matches!(err, XrefError::StoreParse(_)));
}

#[test]
fn touch_updates_only_matching_identities() {
    let mut old = record("URS1", 1);
    old.modified_at = chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap();
    let mut other = record("URS2", 1);
    other.modified_at = old.modified_at;
    let store = SnapshotStore::in_memory(
        Snapshot {
            genes: vec![gene(1, "Mir21", 10116)],
            records: vec![old.clone(), other.clone()],
            ..Snapshot::default()
        },
        20,
    );

    assert_eq!(store.touch_modification_date(&[key("URS1", 1)]).unwrap(), 1);
    let records = store.snapshot().unwrap().records;
    assert!(records[0].modified_at > old.modified_at);
    assert_eq!(records[0].created_at, old.created_at);
    assert_eq!(records[1].modified_at, other.modified_at);
}

#[test]
fn ensembl_lookup_ignores_stored_version() {
    let store = SnapshotStore::in_memory(
        Snapshot {
            genes: vec![gene(5, "LINC02328", 9606)],
            gene_xrefs: vec![GeneXref {
                xdb_key: 20,
                accession: "ENSG00000258428.5".to_string(),
                subject_id: SubjectId(5),
            }],
            ..Snapshot::default()
        },
        20,
    );
    let genes = store
        .active_genes_by_external_gene_id("ENSG00000258428")
        .unwrap();
    assert_eq!(genes.len(), 1);
    assert_eq!(genes[0].symbol, "LINC02328");
}

#[test]
fn failed_write_leaves_snapshot_unchanged() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("store");
    std::fs::create_dir(&dir).unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.join("store.json")).unwrap();
    let resident = record("URS1", 1);
    let snapshot = Snapshot {
        genes: vec![gene(1, "Mir21", 10116)],
        records: vec![resident.clone()],
        ..Snapshot::default()
    };
    std::fs::write(path.as_std_path(), serde_json::to_vec(&snapshot).unwrap()).unwrap();
    let store = SnapshotStore::open(&path, 20).unwrap();

    // the store directory turns into a plain file, so no snapshot can be written
    std::fs::remove_dir_all(&dir).unwrap();
    std::fs::write(&dir, b"").unwrap();

    assert!(matches!(
        store.insert_records(&[record("URS2", 1)]),
        Err(XrefError::Filesystem(_))
    ));
    assert!(matches!(
        store.delete_records(&[record("URS1", 1)]),
        Err(XrefError::Filesystem(_))
    ));
    assert!(matches!(
        store.touch_modification_date(&[key("URS1", 1)]),
        Err(XrefError::Filesystem(_))
    ));

    let records = store.snapshot().unwrap().records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key(), resident.key());
    assert_eq!(records[0].modified_at, resident.modified_at);
}
