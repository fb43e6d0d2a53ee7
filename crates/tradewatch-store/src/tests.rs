use crate::AlertStore;
use crate::error::StoreError;
use tempfile::TempDir;
use tradewatch_common::types::{FieldSet, NewAlert};

fn setup() -> (TempDir, AlertStore) {
    let dir = TempDir::new().unwrap();
    let fields =
        FieldSet::new(vec!["Timestamp".into(), "Ticker".into(), "Action".into()]).unwrap();
    let store = AlertStore::open(dir.path(), fields).unwrap();
    (dir, store)
}

fn make_alert(message_id: &str, ticker: &str) -> NewAlert {
    NewAlert {
        message_id: message_id.to_string(),
        timestamp: "Mon, 6 Nov 2023 14:30:00 +0000".to_string(),
        alert_name: "Momentum Long".to_string(),
        fields: vec![
            Some("2023-11-06T14:30:00Z".to_string()),
            Some(ticker.to_string()),
            Some("buy".to_string()),
        ],
    }
}

#[test]
fn insert_and_read_back() {
    let (_dir, store) = setup();

    assert!(store.insert_if_absent(&make_alert("msg-1", "BTCUSD")).unwrap());

    let records = store.select_after(0).unwrap();
    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!(rec.message_id, "msg-1");
    assert_eq!(rec.alert_name, "Momentum Long");
    assert_eq!(rec.fields[1].as_deref(), Some("BTCUSD"));
}

#[test]
fn insert_same_message_id_is_idempotent() {
    let (_dir, store) = setup();

    assert!(store.insert_if_absent(&make_alert("msg-1", "BTCUSD")).unwrap());
    // A re-fetch of the same message must not create a second row or
    // overwrite the first.
    assert!(!store.insert_if_absent(&make_alert("msg-1", "ETHUSD")).unwrap());

    let records = store.select_after(0).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields[1].as_deref(), Some("BTCUSD"));
}

#[test]
fn contains_reflects_inserts() {
    let (_dir, store) = setup();

    assert!(!store.contains("msg-1").unwrap());
    store.insert_if_absent(&make_alert("msg-1", "BTCUSD")).unwrap();
    assert!(store.contains("msg-1").unwrap());
}

#[test]
fn select_after_filters_and_orders_by_seq() {
    let (_dir, store) = setup();

    for i in 0..5 {
        store
            .insert_if_absent(&make_alert(&format!("msg-{i}"), "BTCUSD"))
            .unwrap();
    }

    let all = store.select_after(0).unwrap();
    assert_eq!(all.len(), 5);
    for pair in all.windows(2) {
        assert!(pair[0].seq < pair[1].seq);
    }

    let tail = store.select_after(all[2].seq).unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].message_id, "msg-3");
}

#[test]
fn advancing_cursor_never_repeats_records() {
    let (_dir, store) = setup();

    store.insert_if_absent(&make_alert("msg-a", "BTCUSD")).unwrap();
    store.insert_if_absent(&make_alert("msg-b", "BTCUSD")).unwrap();

    let first = store.select_after(0).unwrap();
    let cursor = first.last().unwrap().seq;

    store.insert_if_absent(&make_alert("msg-c", "BTCUSD")).unwrap();

    let second = store.select_after(cursor).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].message_id, "msg-c");

    // Nothing new: empty result, not a replay.
    let third = store.select_after(second[0].seq).unwrap();
    assert!(third.is_empty());
}

#[test]
fn reopen_preserves_rows_and_schema() {
    let dir = TempDir::new().unwrap();
    let fields =
        FieldSet::new(vec!["Timestamp".into(), "Ticker".into(), "Action".into()]).unwrap();

    {
        let store = AlertStore::open(dir.path(), fields.clone()).unwrap();
        store.insert_if_absent(&make_alert("msg-1", "BTCUSD")).unwrap();
    }

    // Second open runs CREATE TABLE IF NOT EXISTS against the same file.
    let store = AlertStore::open(dir.path(), fields).unwrap();
    let records = store.select_after(0).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message_id, "msg-1");
}

#[test]
fn timestamp_named_fields_use_datetime_columns() {
    let (_dir, store) = setup();

    let conn = store.conn.lock().unwrap();
    let mut stmt = conn.prepare("PRAGMA table_info(alerts)").unwrap();
    let columns: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();

    let col_type = |name: &str| {
        columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
            .unwrap()
    };
    assert_eq!(col_type("timestamp"), "DATETIME");
    assert_eq!(col_type("msg_timestamp"), "DATETIME");
    assert_eq!(col_type("ticker"), "TEXT");
}

#[test]
fn absent_field_values_roundtrip_as_none() {
    let (_dir, store) = setup();

    let alert = NewAlert {
        message_id: "msg-1".to_string(),
        timestamp: "Mon, 6 Nov 2023 14:30:00 +0000".to_string(),
        alert_name: "Momentum Long".to_string(),
        fields: vec![Some("2023-11-06T14:30:00Z".to_string()), None, None],
    };
    store.insert_if_absent(&alert).unwrap();

    let records = store.select_after(0).unwrap();
    assert_eq!(records[0].fields[1], None);
    assert_eq!(records[0].fields[2], None);
}

#[test]
fn reserved_field_names_are_rejected() {
    let dir = TempDir::new().unwrap();
    let fields = FieldSet::new(vec!["Ticker".into(), "Alert".into()]).unwrap();
    match AlertStore::open(dir.path(), fields) {
        Err(StoreError::InvalidFields(msg)) => assert!(msg.contains("alert")),
        other => panic!("expected InvalidFields, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn field_count_mismatch_is_rejected() {
    let (_dir, store) = setup();

    let alert = NewAlert {
        message_id: "msg-1".to_string(),
        timestamp: String::new(),
        alert_name: "Momentum Long".to_string(),
        fields: vec![None],
    };
    match store.insert_if_absent(&alert) {
        Err(StoreError::InvalidFields(_)) => {}
        other => panic!("expected InvalidFields, got {other:?}"),
    }
}
