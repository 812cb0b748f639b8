use chrono::NaiveDate;

use super::error::HandlerErr;
use crate::roster::person_id_from_value;

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    v.as_str()
        .map(|s| Some(s.to_string()))
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be string or null", key)))
}

/// Course and person ids may be sent as strings or integers.
pub fn get_required_id(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(person_id_from_value)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| HandlerErr {
        code: "bad_params".to_string(),
        message: "date must be YYYY-MM-DD".to_string(),
        details: Some(serde_json::json!({ "date": raw })),
    })
}

/// `params.date`, defaulting to today's local date when absent.
pub fn get_date_or_today(params: &serde_json::Value) -> Result<NaiveDate, HandlerErr> {
    match get_optional_str(params, "date")? {
        Some(raw) => parse_date(&raw),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
