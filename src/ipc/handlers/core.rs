use crate::clock::{Clock, TimeOfDay};
use crate::db;
use crate::ipc::error::{err, ok, respond, HandlerErr};
use crate::ipc::params::get_optional_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "roll": {
                "open": state.roll.is_open(),
                "courseId": state.roll.course_id(),
                "date": state.roll.date(),
                "mode": state.roll.mode(),
                "people": state.roll.roster().len(),
                "marked": state.roll.ledger().len(),
                "autoRefresh": state.roll.timer_running(),
                "saving": state.roll.is_saving(),
            },
            "clock": {
                "now": state.clock.now(),
                "pinned": state.clock.pinned().is_some(),
            }
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match select_workspace(state, path) {
        Ok(path) => ok(&req.id, json!({ "workspacePath": path })),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

/// Opens (creating if needed) the workspace database and makes it current.
pub fn select_workspace(state: &mut AppState, path: PathBuf) -> anyhow::Result<String> {
    let conn = db::open_db(&path)?;
    let shown = path.to_string_lossy().to_string();
    tracing::info!(workspace = %shown, "workspace selected");
    state.workspace = Some(path);
    state.db = Some(conn);
    Ok(shown)
}

fn clock_pin(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let pinned = match get_optional_str(params, "time")? {
        Some(raw) => Some(raw.parse::<TimeOfDay>()?),
        None => None,
    };
    state.clock.pin(pinned);
    tracing::info!(pinned = ?pinned.map(|t| t.to_string()), "clock pin changed");
    Ok(json!({
        "now": state.clock.now(),
        "pinned": pinned.is_some(),
        "preview": state.roll.preview(&state.clock),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "clock.pin" => Some(respond(&req.id, clock_pin(state, &req.params))),
        _ => None,
    }
}
