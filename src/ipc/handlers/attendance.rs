use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::params::{get_required_id, get_required_str, parse_date};
use crate::ipc::types::{AppState, Request};
use crate::tally;
use serde_json::json;

fn attendance_load(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let course_id = get_required_id(params, "courseId")?;
    let date = parse_date(&get_required_str(params, "date")?)?;
    let ledger = db::load_ledger(conn, &course_id, date).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let saved_at = db::last_saved_at(conn, &course_id, date).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let records: Vec<serde_json::Value> = ledger
        .iter()
        .map(|(person_id, status)| json!({ "personId": person_id, "status": status }))
        .collect();
    let counts = tally::tally(&ledger);
    Ok(json!({
        "courseId": course_id,
        "date": date,
        "savedAt": saved_at,
        "count": counts.total(),
        "records": records,
        "tally": counts,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.load" => Some(respond(&req.id, attendance_load(state, &req.params))),
        _ => None,
    }
}
