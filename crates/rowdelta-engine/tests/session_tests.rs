//! Diff session operations and their boundary logging.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rowdelta_core::logging_facility::test_capture::init_test_capture;
use rowdelta_core::{ExErrorKind, KeepExisting, Overwrite, PreferNonNull, RowChange};
use rowdelta_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use rowdelta_core_types::SideTag;
use rowdelta_engine::DiffSession;
use rowdelta_store::{parse_definition_file, parse_definition_str, DiffDefinition};
use serde::Serialize;
use serde_json::json;

const ORDERS: &str = "
definition_version: 0
name: orders
key:
  - { name: id, type: integer }
value:
  - { name: name, type: string }
  - { name: total, type: money }
translations:
  a: { OrderId: id, Amount: total }
storage:
  page_size: 16
";

#[derive(Serialize)]
struct LegacyOrder {
    #[serde(rename = "OrderId")]
    order_id: i64,
    name: String,
    #[serde(rename = "Amount")]
    amount: String,
}

#[derive(Serialize)]
struct Order {
    id: i64,
    name: String,
    total: String,
}

fn definition(yaml: &str) -> DiffDefinition {
    parse_definition_str(yaml).unwrap()
}

fn load_reference(session: &mut DiffSession) {
    let a = (1..=500).map(|id| LegacyOrder {
        order_id: id,
        name: format!("order {id}"),
        amount: if id == 50 { "60.00" } else { "59.99" }.to_string(),
    });
    let b = (1..=499).chain(std::iter::once(501)).map(|id| Order {
        id,
        name: format!("order {id}"),
        total: "59.99".to_string(),
    });

    assert_eq!(session.load(SideTag::A, a, None).unwrap(), 500);
    assert_eq!(session.load(SideTag::B, b, None).unwrap(), 500);
}

#[test]
fn test_report_over_translated_side() {
    // Given: side A loaded under legacy field names, side B under schema names
    let mut session = DiffSession::open(&definition(ORDERS)).unwrap();
    load_reference(&mut session);

    // When: we report side A
    let report = session.report(SideTag::A, 10).unwrap();

    // Then: the translation lined up both sides
    assert_eq!(report.side, SideTag::A);
    assert_eq!(&report.session_id, session.session_id());
    assert_eq!(report.summary.new, 1);
    assert_eq!(report.summary.changed, 1);
    assert_eq!(report.summary.unchanged, 498);
    assert_eq!(report.summary.missing, 1);

    assert_eq!(report.changed_sample.len(), 1);
    assert_eq!(report.changed_sample[0].canonical_key, "50");
    assert_eq!(
        report.changed_sample[0].field_diff.to_json(),
        json!({"total": ["59.99", "60.00"]})
    );
}

#[test]
fn test_report_serializes_to_json() {
    let mut session = DiffSession::open(&definition(ORDERS)).unwrap();
    load_reference(&mut session);

    let value = serde_json::to_value(session.report(SideTag::B, 1).unwrap()).unwrap();

    assert_eq!(value["side"], json!("b"));
    assert_eq!(
        value["summary"],
        json!({"new": 1, "changed": 1, "unchanged": 498, "missing": 1})
    );
    assert_eq!(
        value["changed_sample"],
        json!([{"canonical_key": "50", "field_diff": {"total": ["60.00", "59.99"]}}])
    );
}

#[test]
fn test_sample_limit_caps_changed_rows() {
    // Given: ten changed rows
    let mut session = DiffSession::open(&definition(ORDERS)).unwrap();
    let rows = |total: &str| {
        (1..=10)
            .map(|id| json!({"id": id, "name": "n", "total": total}))
            .collect::<Vec<_>>()
    };
    session.load(SideTag::B, rows("1"), None).unwrap();
    session
        .load(
            SideTag::A,
            (1..=10).map(|id| json!({"OrderId": id, "name": "n", "Amount": "2"})),
            None,
        )
        .unwrap();

    // When: the report asks for three samples
    let report = session.report(SideTag::A, 3).unwrap();

    // Then: the first three changed rows in insertion order are sampled
    assert_eq!(report.summary.changed, 10);
    let sampled: Vec<_> = report
        .changed_sample
        .iter()
        .map(|s| s.canonical_key.as_str())
        .collect();
    assert_eq!(sampled, ["1", "2", "3"]);
}

#[test]
fn test_resolver_applies_during_load() {
    let mut session = DiffSession::open(&definition(ORDERS)).unwrap();
    session
        .load(
            SideTag::B,
            [json!({"id": 1, "name": "first", "total": "5"})],
            None,
        )
        .unwrap();

    // Null name keeps the stored one under PreferNonNull
    session
        .load(
            SideTag::B,
            [json!({"id": 1, "name": null, "total": "6"})],
            Some(&PreferNonNull),
        )
        .unwrap();

    let row = session.side(SideTag::B).get_new(None).next().unwrap().unwrap();
    assert_eq!(row.kind(), RowChange::New);
    assert_eq!(row.local().unwrap()["name"], json!("first"));
    assert_eq!(row.local().unwrap()["total"], json!("6.00"));
}

#[test]
fn test_session_default_resolver_and_per_load_override() {
    // Given: a session whose default keeps the first row at a key
    let mut session = DiffSession::open(&definition(ORDERS))
        .unwrap()
        .with_resolver(KeepExisting);
    session
        .load(SideTag::B, [json!({"id": 1, "name": "first", "total": "5"})], None)
        .unwrap();

    // When: a duplicate arrives without a resolver
    session
        .load(SideTag::B, [json!({"id": 1, "name": "second", "total": "6"})], None)
        .unwrap();

    // Then: the default kept the stored row
    let stored = |session: &DiffSession| {
        session.side(SideTag::B).get_new(None).next().unwrap().unwrap().local().cloned().unwrap()
    };
    assert_eq!(stored(&session)["name"], json!("first"));

    // When: a load passes its own resolver
    session
        .load(
            SideTag::B,
            [json!({"id": 1, "name": "third", "total": "7"})],
            Some(&Overwrite),
        )
        .unwrap();

    // Then: the per-load resolver wins
    assert_eq!(stored(&session)["name"], json!("third"));
    assert_eq!(stored(&session)["total"], json!("7.00"));
}

#[test]
fn test_clear_and_has_any_changes() {
    let mut session = DiffSession::open(&definition(ORDERS)).unwrap();
    assert!(!session.has_any_changes(SideTag::A).unwrap());

    session
        .load(SideTag::B, [json!({"id": 7, "name": "x", "total": "1"})], None)
        .unwrap();
    assert!(session.has_any_changes(SideTag::A).unwrap());

    session.clear(SideTag::B).unwrap();
    assert!(!session.has_any_changes(SideTag::A).unwrap());
}

#[test]
fn test_sqlite_session_from_definition_file() {
    // Given: a definition file pointing at a database in a temp directory
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("orders.db");
    let def_path = dir.path().join("orders.yaml");
    let yaml = format!(
        "definition_version: 0\nkey: [{{ name: id, type: int }}]\nvalue: [{{ name: total, type: money }}]\nstorage:\n  backend: sqlite\n  path: {}\n",
        db_path.display()
    );
    std::fs::write(&def_path, yaml).unwrap();

    // When: a session loads both sides
    let def = parse_definition_file(&def_path).unwrap();
    let mut session = DiffSession::open(&def).unwrap();
    session
        .load(SideTag::A, [json!({"id": 1, "total": "1"}), json!({"id": 2, "total": "2"})], None)
        .unwrap();
    session
        .load(SideTag::B, [json!({"id": 2, "total": "2.5"})], None)
        .unwrap();

    // Then: the report reflects the stored rows and the file exists
    let report = session.report(SideTag::A, 5).unwrap();
    assert_eq!(report.summary.new, 1);
    assert_eq!(report.summary.changed, 1);
    assert!(db_path.exists());
}

#[test]
fn test_open_rejects_unknown_type_tag() {
    // Definitions built in code skip file validation; open still checks the schema
    let mut def = definition(ORDERS);
    def.value[0].type_tag = "currency".to_string();

    let err = DiffSession::open(&def).unwrap_err();
    assert_eq!(err.code(), "ERR_INVALID_SCHEMA");
}

#[test]
fn test_operations_emit_boundary_events() {
    let capture = init_test_capture();

    // Given: a session
    let mut session = DiffSession::open(&definition(ORDERS)).unwrap();
    let sid = session.session_id().to_string();

    // When: we load and report
    session
        .load(SideTag::B, [json!({"id": 1, "name": "n", "total": "1"})], None)
        .unwrap();
    session.report(SideTag::B, 1).unwrap();

    // Then: each operation logs start then end, tagged with the session
    let for_session = |op: &str| -> Vec<String> {
        capture
            .events_for_op(op)
            .into_iter()
            .filter(|e| e.session_id.as_deref() == Some(sid.as_str()))
            .filter_map(|e| e.event)
            .collect()
    };
    assert_eq!(for_session("session_load"), [EVENT_START, EVENT_END]);
    assert_eq!(for_session("session_report"), [EVENT_START, EVENT_END]);

    let load_end = capture
        .events_for_op("session_load")
        .into_iter()
        .find(|e| {
            e.session_id.as_deref() == Some(sid.as_str()) && e.event.as_deref() == Some(EVENT_END)
        })
        .unwrap();
    assert_eq!(load_end.side.as_deref(), Some("b"));
    assert_eq!(load_end.field("row_count"), Some("1"));
    assert!(load_end.field("duration_ms").is_some());
}

#[test]
fn test_failed_load_emits_error_event() {
    let capture = init_test_capture();

    // Given: a session and a row without its total
    let mut session = DiffSession::open(&definition(ORDERS)).unwrap();
    let sid = session.session_id().to_string();

    // When: the load fails
    let err = session
        .load(SideTag::A, [json!({"OrderId": 1, "name": "n"})], None)
        .unwrap_err();

    // Then: the error carries context and the boundary logs end_error
    assert_eq!(err.kind(), ExErrorKind::MissingField);
    assert_eq!(err.field(), Some("total"));
    assert_eq!(err.side(), Some(SideTag::A));

    let error_event = capture
        .events_for_op("session_load")
        .into_iter()
        .find(|e| {
            e.session_id.as_deref() == Some(sid.as_str())
                && e.event.as_deref() == Some(EVENT_END_ERROR)
        })
        .unwrap();
    assert_eq!(error_event.field("err_code"), Some("ERR_MISSING_FIELD"));
    assert_eq!(error_event.level, tracing::Level::ERROR);
}
