use beenhere_protocol::{Request, Response};

use crate::service::handle;
use crate::testutil::memory_tracker;

fn parse(json: &str) -> Request {
    serde_json::from_str(json).unwrap()
}

#[test]
fn check_visited_links_reports_states_per_token() {
    let tracker = memory_tracker();
    tracker.record_visit("https://a.com/p?x=1&y=2").unwrap();

    let request = parse(
        r#"{
            "type": "CHECK_VISITED_LINKS",
            "links": [
                {"href": "https://a.com/p?x=1&y=2", "token": "t-full"},
                {"href": "https://a.com/p?x=1&z=3", "token": "t-partial"},
                {"href": "https://other.com/", "token": "t-none"},
                {"href": "ftp://nope", "token": "t-skip"}
            ]
        }"#,
    );
    let response = handle(&tracker, request);
    let json = serde_json::to_value(&response).unwrap();
    let visited = json["visitedLinks"].as_array().unwrap();
    assert_eq!(visited.len(), 2);
    assert!(visited
        .iter()
        .any(|v| v["token"] == "t-full" && v["state"] == "full"));
    assert!(visited
        .iter()
        .any(|v| v["token"] == "t-partial" && v["state"] == "partial"));
}

#[test]
fn check_visited_links_honors_skip_flags() {
    let tracker = memory_tracker();
    tracker.record_visit("https://a.com/p?x=1&y=2").unwrap();

    let request = parse(
        r#"{
            "type": "CHECK_VISITED_LINKS",
            "links": [{"href": "https://a.com/p?x=1&z=3", "token": "t"}],
            "skipPartial": true
        }"#,
    );
    let response = handle(&tracker, request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(json["visitedLinks"].as_array().unwrap().is_empty());
}

#[test]
fn get_visit_for_url_shape() {
    let tracker = memory_tracker();
    tracker.record_visit("https://a.com/p").unwrap();
    tracker.record_visit("https://a.com/p").unwrap();

    let response = handle(
        &tracker,
        parse(r#"{"type":"GET_VISIT_FOR_URL","url":"https://a.com/p"}"#),
    );
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["visitCount"], 2);
    assert_eq!(json["matchState"], "full");
    assert!(json["lastVisited"].is_i64());
}

#[test]
fn get_stats_totals_and_views() {
    let tracker = memory_tracker();
    tracker.record_visit("https://a.com/p").unwrap();
    tracker.record_visit("https://a.com/p").unwrap();
    tracker.record_visit("https://b.com/q").unwrap();

    let response = handle(&tracker, parse(r#"{"type":"GET_STATS"}"#));
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["totalEntries"], 2);
    assert_eq!(json["totalVisits"], 3);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
}

#[test]
fn stats_withhold_hashed_addresses() {
    let tracker = memory_tracker();
    tracker.set_encryption_enabled(true).unwrap();
    tracker.record_visit("https://secret.example/p").unwrap();

    let response = handle(&tracker, parse(r#"{"type":"GET_STATS"}"#));
    let json = serde_json::to_value(&response).unwrap();
    let item = &json["items"][0];
    assert_eq!(item["hashed"], true);
    assert_eq!(item["address"], "???");
    assert_eq!(item["host"], "???");
    assert!(!item["id"].as_str().unwrap().contains("secret.example"));
}

#[test]
fn delete_visit_removes_the_record() {
    let tracker = memory_tracker();
    tracker.record_visit("https://a.com/p").unwrap();
    let stats = tracker.stats().unwrap();
    let id = stats.recent[0].id();

    let response = handle(
        &tracker,
        Request::DeleteVisit {
            id: id.as_str().to_string(),
        },
    );
    assert!(matches!(response, Response::Ack(_)));
    assert_eq!(tracker.stats().unwrap().total_entries, 0);
}

#[test]
fn import_preview_and_commit() {
    let tracker = memory_tracker();

    let preview = handle(
        &tracker,
        parse(r#"{"type":"IMPORT_ADDRESSES","content":"a.com\nbad url","preview":true}"#),
    );
    let json = serde_json::to_value(&preview).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["valid"], 1);
    assert_eq!(json["invalid"], 1);
    assert_eq!(json["total"], 2);
    assert_eq!(tracker.stats().unwrap().total_entries, 0);

    let commit = handle(
        &tracker,
        parse(r#"{"type":"IMPORT_ADDRESSES","content":"a.com\nbad url"}"#),
    );
    let json = serde_json::to_value(&commit).unwrap();
    assert_eq!(json["imported"], 1);
    assert_eq!(tracker.stats().unwrap().total_entries, 1);
}

#[test]
fn export_csv_response_carries_artifact() {
    let tracker = memory_tracker();
    tracker.record_visit("https://a.com/p").unwrap();

    let response = handle(&tracker, parse(r#"{"type":"EXPORT_VISITS_CSV"}"#));
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["exported"], 1);
    assert!(json["filename"].as_str().unwrap().ends_with(".csv"));
    assert!(json["content"]
        .as_str()
        .unwrap()
        .contains("address;date;count;type"));
}

#[test]
fn encryption_toggle_roundtrip() {
    let tracker = memory_tracker();
    let response = handle(&tracker, parse(r#"{"type":"GET_ENCRYPTION_ENABLED"}"#));
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["encryptionEnabled"], false);

    handle(
        &tracker,
        parse(r#"{"type":"SET_ENCRYPTION_ENABLED","enabled":true}"#),
    );
    let response = handle(&tracker, parse(r#"{"type":"GET_ENCRYPTION_ENABLED"}"#));
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["encryptionEnabled"], true);
}

#[test]
fn backup_and_restore_via_requests() {
    let tracker = memory_tracker();
    tracker.record_visit("https://a.com/p").unwrap();

    let backup = handle(
        &tracker,
        parse(r#"{"type":"CREATE_BACKUP_DOWNLOAD","password":"pw"}"#),
    );
    let backup_json = serde_json::to_value(&backup).unwrap();
    assert_eq!(backup_json["ok"], true);
    assert!(backup_json["filename"].as_str().unwrap().ends_with(".bak"));

    let target = memory_tracker();
    let restore_request = serde_json::json!({
        "type": "RESTORE_BACKUP",
        "password": "pw",
        "envelope": backup_json["envelope"],
    });
    let response = handle(&target, serde_json::from_value(restore_request).unwrap());
    assert!(matches!(response, Response::Ack(_)));
    assert_eq!(target.stats().unwrap().total_entries, 1);
}

#[test]
fn restore_with_wrong_password_shapes_an_error_response() {
    let tracker = memory_tracker();
    let backup = tracker.create_backup("right").unwrap();

    let response = handle(
        &tracker,
        Request::RestoreBackup {
            password: "wrong".into(),
            envelope: backup.envelope,
            merge_visits: false,
        },
    );
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["ok"], false);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("wrong password or corrupted file"));
}

#[test]
fn exception_list_roundtrip() {
    let tracker = memory_tracker();
    let response = handle(
        &tracker,
        parse(r#"{"type":"SET_MATCH_EXCEPTIONS","items":["Blocked.Example "," b.com",""]}"#),
    );
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(
        json["items"],
        serde_json::json!(["b.com", "blocked.example"])
    );

    let response = handle(&tracker, parse(r#"{"type":"GET_MATCH_EXCEPTIONS"}"#));
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(
        json["items"],
        serde_json::json!(["b.com", "blocked.example"])
    );
}

#[test]
fn get_partial_matches_returns_views() {
    let tracker = memory_tracker();
    tracker.record_visit("https://a.com/p?x=1&y=2").unwrap();

    let response = handle(
        &tracker,
        parse(r#"{"type":"GET_PARTIAL_MATCHES","url":"https://a.com/p?x=1&z=3"}"#),
    );
    let json = serde_json::to_value(&response).unwrap();
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["address"], "a.com/p?x=1&y=2");
}
