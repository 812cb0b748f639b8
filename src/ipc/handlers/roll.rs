use crate::classify::WindowEdge;
use crate::clock::TimeOfDay;
use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::handlers::roster::parse_people;
use crate::ipc::params::{get_date_or_today, get_required_id, get_required_str, parse_date};
use crate::ipc::types::{AppState, Request};
use crate::ledger::{AttendanceLedger, AttendanceStatus};
use crate::session::Mode;
use chrono::NaiveDate;
use serde_json::json;

fn view_json(state: &AppState) -> serde_json::Value {
    json!(state.roll.view(&state.clock))
}

/// Ledger the host hands over for a course and date: the last saved roll
/// when a workspace is open, otherwise a blank one.
fn supplied_ledger(state: &AppState, course_id: &str, date: NaiveDate) -> Result<AttendanceLedger, HandlerErr> {
    match state.db.as_ref() {
        Some(conn) => db::load_ledger(conn, course_id, date)
            .map_err(|e| HandlerErr::db("db_query_failed", e)),
        None => Ok(AttendanceLedger::new()),
    }
}

fn roll_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_id(params, "courseId")?;
    let date = get_date_or_today(params)?;
    let roster = if params.get("people").is_some() {
        parse_people(params)?
    } else {
        let Some(conn) = state.db.as_ref() else {
            return Err(HandlerErr::new(
                "no_workspace",
                "select a workspace or pass people inline",
            ));
        };
        if !db::course_exists(conn, &course_id).map_err(|e| HandlerErr::db("db_query_failed", e))? {
            return Err(HandlerErr::new("not_found", "course not found"));
        }
        db::list_roster(conn, &course_id).map_err(|e| HandlerErr::db("db_query_failed", e))?
    };
    let ledger = supplied_ledger(state, &course_id, date)?;
    state.roll.open(&course_id, roster, date, ledger);
    Ok(view_json(state))
}

fn roll_close(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state.roll.close();
    Ok(json!({ "open": false }))
}

fn roll_set_mode(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mode = Mode::parse(&get_required_str(params, "mode")?)?;
    state.roll.set_mode(mode)?;
    Ok(view_json(state))
}

fn roll_search(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let query = match params.get("query") {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| HandlerErr::bad_params("query must be string or null"))?,
    };
    state.roll.set_query(&query)?;
    Ok(view_json(state))
}

fn roll_page(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    if let Some(page) = params.get("page") {
        let page = page
            .as_u64()
            .ok_or_else(|| HandlerErr::bad_params("page must be a positive integer"))?;
        state.roll.goto_page(page as usize)?;
    } else {
        match get_required_str(params, "step")?.as_str() {
            "next" => state.roll.next_page()?,
            "prev" => state.roll.prev_page()?,
            _ => return Err(HandlerErr::bad_params("step must be one of: next, prev")),
        };
    }
    Ok(view_json(state))
}

fn roll_set_window(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let edge = WindowEdge::parse(&get_required_str(params, "edge")?)?;
    let at: TimeOfDay = get_required_str(params, "time")?.parse()?;
    state.roll.set_window_edge(edge, at);
    Ok(json!({
        "windows": state.roll.windows(),
        "preview": state.roll.preview(&state.clock),
    }))
}

fn roll_set_date(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let date = parse_date(&get_required_str(params, "date")?)?;
    let Some(course_id) = state.roll.course_id().map(str::to_string) else {
        return Err(HandlerErr::new("not_open", "open a roll first"));
    };
    let ledger = supplied_ledger(state, &course_id, date)?;
    state.roll.set_date(date, ledger)?;
    Ok(view_json(state))
}

fn roll_toggle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let person_id = get_required_id(params, "personId")?;
    let status = state.roll.toggle(&person_id, &state.clock)?;
    Ok(json!({
        "personId": person_id,
        "status": status,
        "tally": state.roll.tally(),
    }))
}

fn roll_mark_all(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "status")?;
    let Some(status) = AttendanceStatus::parse(&raw) else {
        return Err(HandlerErr {
            code: "bad_params".to_string(),
            message: "status must be one of: PRESENT, ABSENT, LATE".to_string(),
            details: Some(json!({ "status": raw })),
        });
    };
    state.roll.mark_all(status)?;
    Ok(view_json(state))
}

fn roll_save(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let Some(conn) = state.db.as_mut() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let batch = state.roll.save(conn)?;
    Ok(json!({
        "batchId": batch.id,
        "courseId": batch.course_id,
        "date": batch.date,
        "count": batch.entries.len(),
        "tally": batch.tally,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "roll.open" => roll_open(state, &req.params),
        "roll.close" => roll_close(state),
        "roll.view" => Ok(view_json(state)),
        "roll.setMode" => roll_set_mode(state, &req.params),
        "roll.search" => roll_search(state, &req.params),
        "roll.page" => roll_page(state, &req.params),
        "roll.setWindow" => roll_set_window(state, &req.params),
        "roll.setDate" => roll_set_date(state, &req.params),
        "roll.toggle" => roll_toggle(state, &req.params),
        "roll.markAll" => roll_mark_all(state, &req.params),
        "roll.save" => roll_save(state),
        _ => return None,
    };
    Some(respond(&req.id, outcome))
}
