use serde_json::json;

use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::roster::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::roll::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req) {
        return resp;
    }

    tracing::debug!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

/// Auto-refresh tick from the timer thread. Produces an unsolicited event
/// line carrying the fresh preview, or nothing when the tick is stale.
pub fn handle_tick(state: &mut AppState, generation: u64) -> Option<serde_json::Value> {
    let preview = state.roll.on_tick(generation, &state.clock)?;
    Some(json!({
        "event": "roll.autoPreview",
        "result": preview,
    }))
}
