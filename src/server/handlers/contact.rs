//! Public contact form

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::{Value, json};

use super::{json_body, timestamp};
use crate::client::dataverse::short_id;
use crate::error::ErrorKind;
use crate::server::SharedState;
use crate::server::error::{HandlerError, HandlerResult};
use crate::validation::validate_contact;

/// Headers that may carry the caller's address, most trusted first
const IP_HEADERS: [&str; 5] = [
    "x-forwarded-for",
    "x-real-ip",
    "x-client-ip",
    "cf-connecting-ip",
    "x-azure-clientip",
];

/// First address from the first forwarding header present
fn client_ip(headers: &HeaderMap) -> Option<String> {
    IP_HEADERS.iter().find_map(|name| {
        let value = headers.get(*name)?.to_str().ok()?;
        let first = value.split(',').next()?.trim();
        (!first.is_empty()).then(|| first.to_string())
    })
}

fn failure(err: crate::error::Error) -> HandlerError {
    let message = match err.kind() {
        ErrorKind::Validation => return HandlerError::bad_request("Invalid submission data"),
        ErrorKind::Config => "Server configuration error. Please try again later.",
        ErrorKind::Auth => "Server authentication error. Please try again later.",
        ErrorKind::Authz => "Server permission error. Please try again later.",
        _ => "An unexpected error occurred. Please try again later.",
    };
    HandlerError::internal(message)
}

pub async fn submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult<Json<Value>> {
    let body = json_body(&body)?;
    let mut submission = validate_contact(&body).map_err(|e| {
        log::warn!("Rejected contact submission ({}): {}", e.field, e);
        HandlerError::from(e)
    })?;
    submission.ip_address = client_ip(&headers);

    let crm = state.crm().map_err(|e| {
        log::error!("Contact submission failed: {}", e);
        failure(e)
    })?;

    log::info!(
        "Processing contact submission (service: {})",
        submission.service.map(|s| s.as_str()).unwrap_or("none")
    );

    let record_id = crm
        .create_contact_submission(&submission)
        .await
        .map_err(|e| {
            log::error!("Contact submission failed: {}", e);
            failure(e)
        })?;

    log::info!("Contact submission saved as {}", short_id(&record_id));

    Ok(Json(json!({
        "message": "Thank you! Your message has been received and saved. We will contact you soon.",
        "submissionId": record_id,
        "timestamp": timestamp(),
    })))
}
