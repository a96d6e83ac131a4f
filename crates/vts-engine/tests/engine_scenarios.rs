//! End-to-end engine scenarios: versioned history, row identity, sampling,
//! updates through the function library and persistent reopen.

use tempfile::tempdir;
use vts_core::schema::Schema;
use vts_core::table::Table;
use vts_core::value::Value;
use vts_engine::{ColumnRef, ColumnStatsProfiler, Engine, EngineError};

fn people_v0() -> Table {
    let mut t = Table::new(Schema::of(["id", "name"]));
    t.push_row([Value::Int(1), Value::from("ann")]);
    t.push_row([Value::Int(2), Value::from("bob")]);
    t
}

fn people_v1() -> Table {
    let mut t = Table::new(Schema::of(["id", "name"]));
    t.push_row([Value::Int(1), Value::from("anne")]);
    t.push_row([Value::Int(3), Value::from("cid")]);
    t
}

fn pk() -> Option<Vec<String>> {
    Some(vec!["id".to_string()])
}

#[test]
fn versioned_history_with_stable_row_identity() {
    let engine = Engine::volatile();
    let v0 = engine.create(&people_v0(), "people", pk(), true).unwrap();
    assert!(v0.data_eq(&people_v0()));

    let v1 = engine.commit("people", &people_v1(), None).unwrap();
    assert!(v1.data_eq(&people_v1()));

    // Two versions, both with two rows.
    let history = engine.history("people").unwrap();
    let versions: Vec<_> = history.iter().map(|d| d.version).collect();
    let counts: Vec<_> = history.iter().map(|d| d.rows).collect();
    assert_eq!(versions, vec![0, 1]);
    assert_eq!(counts, vec![2, 2]);

    // id=1 kept its identifier through the rename; id=2's identifier is
    // gone; id=3 is fresh.
    let first = engine.checkout("people", Some(0)).unwrap();
    let second = engine.checkout("people", Some(1)).unwrap();
    assert_eq!(second.row(0).unwrap().id, first.row(0).unwrap().id);
    let retired = first.row(1).unwrap().id;
    assert!(second.rows().iter().all(|r| r.id != retired));
}

#[test]
fn checkout_after_commit_round_trips_with_and_without_cache() {
    for cached in [true, false] {
        let engine = Engine::volatile();
        engine.create(&people_v0(), "people", pk(), cached).unwrap();
        engine.commit("people", &people_v1(), None).unwrap();
        assert!(engine
            .checkout("people", None)
            .unwrap()
            .data_eq(&people_v1()));
    }
}

#[test]
fn unknown_version_error_carries_the_version() {
    let engine = Engine::volatile();
    engine.create(&people_v0(), "people", pk(), true).unwrap();

    let err = engine.checkout("people", Some(999)).unwrap_err();
    match err {
        EngineError::Archive(vts_archive::ArchiveError::UnknownVersion { version, latest }) => {
            assert_eq!(version, 999);
            assert_eq!(latest, Some(0));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn sampling_is_deterministic_per_seed_and_records_lineage() {
    let engine = Engine::volatile();
    engine.create(&people_v0(), "people", pk(), true).unwrap();

    let first = engine.sample("people", 1, Some(42)).unwrap();
    let second = engine.sample("people", 1, Some(42)).unwrap();
    assert_ne!(first, second);

    let a = engine.checkout(&first, None).unwrap();
    let b = engine.checkout(&second, None).unwrap();
    assert_eq!(a.len(), 1);
    assert!(a.data_eq(&b));

    let handle = engine.dataset(&first).unwrap();
    assert_eq!(handle.source(), Some("people"));
    assert!(handle.archive_id().is_none());

    // A sample holds the full dataset when the size covers every row, and
    // its history starts fresh at version 0.
    let full = engine.sample("people", 100, None).unwrap();
    let table = engine.checkout(&full, None).unwrap();
    assert!(table.data_eq(&people_v0()));
    assert_eq!(engine.history(&full).unwrap().len(), 1);
}

#[test]
fn update_applies_a_library_function() {
    let engine = Engine::volatile();
    engine.create(&people_v0(), "people", pk(), true).unwrap();

    let updated = engine
        .update(
            "people",
            &[ColumnRef::from("name")],
            "upper",
            Some("string"),
            None,
        )
        .unwrap();
    let names: Vec<_> = updated.column(1).cloned().collect();
    assert_eq!(names, vec![Value::from("ANN"), Value::from("BOB")]);

    // Row identity survived the in-place update.
    let v0 = engine.checkout("people", Some(0)).unwrap();
    assert_eq!(updated.row(0).unwrap().id, v0.row(0).unwrap().id);

    // The action descriptor names the operation.
    let history = engine.history("people").unwrap();
    let action = history[1].action.as_ref().unwrap();
    assert_eq!(action["op"], "update");
    assert_eq!(action["function"], "upper");

    let missing = engine.update("people", &[ColumnRef::from("name")], "shout", None, None);
    assert!(matches!(missing, Err(EngineError::UnknownFunction { .. })));
}

#[test]
fn profile_stores_the_report_as_dataset_metadata() {
    let engine = Engine::volatile();
    engine.create(&people_v0(), "people", pk(), true).unwrap();

    let report = engine
        .profile("people", None, &ColumnStatsProfiler::new())
        .unwrap();
    assert_eq!(report["rows"], 2);

    let stored = engine
        .metadata("people", Some(0))
        .unwrap()
        .read(None, None)
        .unwrap();
    assert_eq!(stored["profiling"], report);
}

#[test]
fn persistent_engine_restores_datasets_on_reopen() {
    let dir = tempdir().unwrap();
    {
        let engine = Engine::persistent(dir.path(), true, true).unwrap();
        engine.create(&people_v0(), "people", pk(), true).unwrap();
        engine.commit("people", &people_v1(), None).unwrap();

        let metadata = engine.metadata("people", Some(1)).unwrap();
        let mut doc = vts_store::AnnotationDoc::new();
        doc.insert("reviewed".into(), serde_json::json!(true));
        metadata.write(doc, None, None).unwrap();
    }

    let engine = Engine::persistent(dir.path(), false, true).unwrap();
    assert_eq!(engine.names(), vec!["people".to_string()]);
    assert!(engine
        .checkout("people", None)
        .unwrap()
        .data_eq(&people_v1()));
    assert_eq!(engine.history("people").unwrap().len(), 2);

    // Annotations reopened from disk as well.
    let stored = engine
        .metadata("people", Some(1))
        .unwrap()
        .read(None, None)
        .unwrap();
    assert_eq!(stored["reviewed"], serde_json::json!(true));

    // The declared primary key still drives identity after reopen.
    let handle = engine.dataset("people").unwrap();
    assert_eq!(handle.primary_key(), Some(&["id".to_string()][..]));
}

#[test]
fn dropping_a_persistent_dataset_releases_its_archive() {
    let dir = tempdir().unwrap();
    let engine = Engine::persistent(dir.path(), true, true).unwrap();
    engine.create(&people_v0(), "people", pk(), true).unwrap();
    let archive_id = engine
        .dataset("people")
        .unwrap()
        .archive_id()
        .cloned()
        .unwrap();
    assert!(dir.path().join(&archive_id.0).exists());

    engine.drop_dataset("people").unwrap();
    assert!(!dir.path().join(&archive_id.0).exists());

    // Nothing comes back on reopen.
    drop(engine);
    let engine = Engine::persistent(dir.path(), false, true).unwrap();
    assert!(engine.names().is_empty());
}
