use serde_json::json;

use crate::error::RollError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Failure of a single handler, turned into an error envelope at the
/// dispatch edge.
pub struct HandlerErr {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    /// Storage failure; the full anyhow chain goes into the message.
    pub fn db(code: &str, e: anyhow::Error) -> Self {
        Self::new(code, format!("{e:#}"))
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, &self.code, self.message, self.details)
    }
}

impl From<RollError> for HandlerErr {
    fn from(e: RollError) -> Self {
        Self {
            code: e.code,
            message: e.message,
            details: e.details,
        }
    }
}

pub fn respond(id: &str, outcome: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match outcome {
        Ok(result) => ok(id, result),
        Err(error) => error.response(id),
    }
}
