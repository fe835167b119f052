//! Route handlers and the request helpers they share

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::error::{HandlerError, HandlerResult};

pub mod contact;
pub mod documents;
pub mod health;
pub mod login;
pub mod orgchart;
pub mod registration;
pub mod wordpress;

/// Parse a required JSON object body
pub(crate) fn json_body(body: &Bytes) -> HandlerResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(HandlerError::bad_request("Request body is required"));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) | Err(_) => Err(HandlerError::bad_request("Request body is required")),
    }
}

/// Current time as an RFC 3339 string with millisecond precision
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Token from an `Authorization: Bearer <token>` header
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
