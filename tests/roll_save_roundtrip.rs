use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rollcalld");
    let mut child = Command::new(exe)
        .env_remove("ROLLCALL_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rollcalld");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn ten_people() -> serde_json::Value {
    let people: Vec<serde_json::Value> = (1..=10)
        .map(|i| {
            json!({
                "id": i,
                "firstName": format!("P{}", i),
                "lastName": "Ortega",
                "documentNumber": format!("{:08}", 40000000 + i),
            })
        })
        .collect();
    json!(people)
}

#[test]
fn mark_all_absent_save_and_load_back() {
    let workspace = temp_dir("rollcall-save-roundtrip");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.import",
        json!({ "courseId": "bio-1", "name": "Biology", "people": ten_people() }),
    );
    assert_eq!(imported["count"], json!(10));

    let listed = request_ok(&mut stdin, &mut reader, "3", "roster.list", json!({ "courseId": "bio-1" }));
    assert_eq!(listed["people"].as_array().map(|a| a.len()), Some(10));
    assert_eq!(listed["people"][0]["id"], json!("1"));
    assert_eq!(listed["people"][9]["id"], json!("10"));

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "roll.open",
        json!({ "courseId": "bio-1", "date": "2024-04-01" }),
    );
    assert_eq!(view["matches"], json!(10));
    assert_eq!(view["tally"]["present"], json!(0));
    assert_eq!(view["tally"]["unmarked"], json!(10));

    let view = request_ok(&mut stdin, &mut reader, "5", "roll.markAll", json!({ "status": "ABSENT" }));
    assert_eq!(view["tally"]["present"], json!(0));
    assert_eq!(view["tally"]["absent"], json!(10));
    assert_eq!(view["tally"]["late"], json!(0));

    let _ = request_ok(&mut stdin, &mut reader, "6", "roll.toggle", json!({ "personId": 3 }));

    let saved = request_ok(&mut stdin, &mut reader, "7", "roll.save", json!({}));
    assert_eq!(saved["courseId"], json!("bio-1"));
    assert_eq!(saved["date"], json!("2024-04-01"));
    assert_eq!(saved["count"], json!(10));
    assert_eq!(saved["tally"], json!({ "present": 0, "absent": 9, "late": 1 }));
    assert!(saved["batchId"].as_str().map(|s| !s.is_empty()).unwrap_or(false));

    let health = request_ok(&mut stdin, &mut reader, "8", "health", json!({}));
    assert_eq!(health["roll"]["saving"], json!(false));
    assert_eq!(health["roll"]["people"], json!(10));
    assert_eq!(health["roll"]["marked"], json!(10));

    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "attendance.load",
        json!({ "courseId": "bio-1", "date": "2024-04-01" }),
    );
    assert_eq!(loaded["records"].as_array().map(|a| a.len()), Some(10));
    assert_eq!(loaded["tally"], json!({ "present": 0, "absent": 9, "late": 1 }));
    assert_eq!(loaded["count"], json!(10));
    assert!(loaded["savedAt"].is_string());
    let late: Vec<&serde_json::Value> = loaded["records"]
        .as_array()
        .expect("records")
        .iter()
        .filter(|r| r["status"] == json!("LATE"))
        .collect();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0]["personId"], json!("3"));

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "attendance.load",
        json!({ "courseId": "bio-1", "date": "2024-04-02" }),
    );
    assert_eq!(empty["records"], json!([]));
    assert_eq!(empty["savedAt"], json!(null));
}

#[test]
fn reopen_and_date_change_pick_up_the_stored_roll() {
    let workspace = temp_dir("rollcall-reopen");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.import",
        json!({ "courseId": "c9", "people": ten_people() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "roll.open",
        json!({ "courseId": "c9", "date": "2024-04-01" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "4", "roll.toggle", json!({ "personId": "1" }));
    let _ = request_ok(&mut stdin, &mut reader, "5", "roll.save", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "6", "roll.close", json!({}));

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "roll.open",
        json!({ "courseId": "c9", "date": "2024-04-01" }),
    );
    assert_eq!(view["people"][0]["status"], json!("ABSENT"));
    assert_eq!(view["people"][0]["marked"], json!(true));
    assert_eq!(view["tally"]["absent"], json!(1));
    assert_eq!(view["tally"]["unmarked"], json!(9));

    let view = request_ok(&mut stdin, &mut reader, "8", "roll.setDate", json!({ "date": "2024-04-02" }));
    assert_eq!(view["date"], json!("2024-04-02"));
    assert_eq!(view["people"][0]["status"], json!("PRESENT"));
    assert_eq!(view["tally"]["absent"], json!(0));

    let view = request_ok(&mut stdin, &mut reader, "9", "roll.setDate", json!({ "date": "2024-04-01" }));
    assert_eq!(view["tally"]["absent"], json!(1));

    // Re-saving the same sitting overwrites rather than duplicates.
    let _ = request_ok(&mut stdin, &mut reader, "10", "roll.markAll", json!({ "status": "PRESENT" }));
    let _ = request_ok(&mut stdin, &mut reader, "11", "roll.save", json!({}));
    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "attendance.load",
        json!({ "courseId": "c9", "date": "2024-04-01" }),
    );
    assert_eq!(loaded["records"].as_array().map(|a| a.len()), Some(10));
    assert_eq!(loaded["tally"], json!({ "present": 10, "absent": 0, "late": 0 }));
}

#[test]
fn workspace_errors_are_reported() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "roster.list", json!({ "courseId": "x" }));
    assert_eq!(resp["error"]["code"], json!("no_workspace"));

    let resp = request(&mut stdin, &mut reader, "2", "roll.open", json!({ "courseId": "x" }));
    assert_eq!(resp["error"]["code"], json!("no_workspace"));

    let workspace = temp_dir("rollcall-errors");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let resp = request(&mut stdin, &mut reader, "4", "roll.open", json!({ "courseId": "ghost" }));
    assert_eq!(resp["error"]["code"], json!("not_found"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "roster.import",
        json!({ "courseId": "dup", "people": [{ "id": 1 }, { "id": "1" }] }),
    );
    assert_eq!(resp["error"]["code"], json!("bad_params"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "6",
        "roll.open",
        json!({ "courseId": "dup", "date": "04/01/2024", "people": [] }),
    );
    assert_eq!(resp["error"]["code"], json!("bad_params"));

    let resp = request(&mut stdin, &mut reader, "7", "roll.save", json!({}));
    assert_eq!(resp["error"]["code"], json!("not_open"));
}

#[test]
fn shrunken_roster_keeps_tally_within_roster_size() {
    let workspace = temp_dir("rollcall-shrunken-roster");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.import",
        json!({ "courseId": "c3", "people": [{ "id": 1 }, { "id": 2 }, { "id": 3 }] }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "roll.open",
        json!({ "courseId": "c3", "date": "2024-04-01" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "4", "roll.markAll", json!({ "status": "ABSENT" }));
    let _ = request_ok(&mut stdin, &mut reader, "5", "roll.save", json!({}));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "roster.import",
        json!({ "courseId": "c3", "people": [{ "id": 1 }] }),
    );
    let view = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "roll.open",
        json!({ "courseId": "c3", "date": "2024-04-01" }),
    );
    let tally = &view["tally"];
    let counted = ["present", "absent", "late"]
        .iter()
        .map(|k| tally[*k].as_u64().expect("count"))
        .sum::<u64>();
    assert_eq!(tally["rosterSize"], json!(1));
    assert!(counted <= 1, "tally {} exceeds roster", tally);
    assert_eq!(tally["absent"], json!(1));

    let _ = request_ok(&mut stdin, &mut reader, "8", "roll.setDate", json!({ "date": "2024-04-02" }));
    let view = request_ok(&mut stdin, &mut reader, "9", "roll.setDate", json!({ "date": "2024-04-01" }));
    assert_eq!(view["tally"]["absent"], json!(1));

    let saved = request_ok(&mut stdin, &mut reader, "10", "roll.save", json!({}));
    assert_eq!(saved["count"], json!(1));
    assert_eq!(saved["tally"], json!({ "present": 0, "absent": 1, "late": 0 }));
}
