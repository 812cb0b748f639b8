use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::params::{get_optional_str, get_required_id};
use crate::ipc::types::{AppState, Request};
use crate::roster::Person;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;

fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// Roster payload from `params.people`. Person records are taken as they
/// come; the only structural rule is that ids are unique.
pub fn parse_people(params: &serde_json::Value) -> Result<Vec<Person>, HandlerErr> {
    let Some(raw) = params.get("people") else {
        return Err(HandlerErr::bad_params("missing people"));
    };
    let people: Vec<Person> = serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("people: {}", e)))?;
    let mut seen = HashSet::new();
    for p in &people {
        if !seen.insert(p.id.as_str()) {
            return Err(HandlerErr {
                code: "bad_params".to_string(),
                message: "duplicate person id".to_string(),
                details: Some(json!({ "personId": p.id })),
            });
        }
    }
    Ok(people)
}

fn roster_import(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let course_id = get_required_id(params, "courseId")?;
    let name = get_optional_str(params, "name")?;
    let people = parse_people(params)?;
    db::replace_roster(conn, &course_id, name.as_deref(), &people)
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    tracing::info!(course_id = %course_id, people = people.len(), "roster imported");
    Ok(json!({ "courseId": course_id, "count": people.len() }))
}

fn roster_list(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let course_id = get_required_id(params, "courseId")?;
    if !db::course_exists(conn, &course_id).map_err(|e| HandlerErr::db("db_query_failed", e))? {
        return Err(HandlerErr::new("not_found", "course not found"));
    }
    let people = db::list_roster(conn, &course_id).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "courseId": course_id, "people": people }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.import" => Some(respond(&req.id, roster_import(state, &req.params))),
        "roster.list" => Some(respond(&req.id, roster_list(state, &req.params))),
        _ => None,
    }
}
