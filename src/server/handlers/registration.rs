//! Client portal self-registration

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{Value, json};

use super::json_body;
use crate::client::CrmApi;
use crate::client::dataverse::short_id;
use crate::error::{Error, ErrorKind, Result};
use crate::models::ClientRecord;
use crate::models::client::CLIENT_STATUS_ACTIVE;
use crate::server::SharedState;
use crate::server::error::{HandlerError, HandlerResult};
use crate::session::{generate_client_number, hash_password};
use crate::validation::{Registration, validate_registration};

fn failure(err: Error) -> HandlerError {
    log::error!("Client registration failed: {}", err);
    match err.kind() {
        ErrorKind::Duplicate => HandlerError::new(
            StatusCode::CONFLICT,
            "Account with this information already exists",
        ),
        ErrorKind::Auth | ErrorKind::Authz => HandlerError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable. Please try again later.",
        ),
        _ => HandlerError::internal("Internal server error during registration"),
    }
}

/// Keep the requested client number when it is free, otherwise allocate one
async fn choose_client_number(crm: &dyn CrmApi, form: &Registration) -> Result<String> {
    if let Some(requested) = form.client_number.as_deref() {
        if !crm.client_number_exists(requested).await? {
            return Ok(requested.to_string());
        }
        log::debug!("Requested client number {} is taken", requested);
    }
    generate_client_number(crm, &form.first_name, &form.last_name).await
}

async fn create_account(crm: &dyn CrmApi, form: Registration) -> Result<(String, String)> {
    let client_number = choose_client_number(crm, &form).await?;
    let password_hash = hash_password(&form.password)?;

    let record = ClientRecord {
        name: format!("{} {}", form.first_name, form.last_name),
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        password_hash,
        client_number: client_number.clone(),
        company: form.company,
        phone: form.phone,
        status: CLIENT_STATUS_ACTIVE,
        login_attempts: 0,
        account_locked: false,
        created_date: Utc::now(),
    };

    let client_id = crm.create_client_record(&record).await?;
    Ok((client_id, client_number))
}

pub async fn register(
    State(state): State<SharedState>,
    body: Bytes,
) -> HandlerResult<(StatusCode, Json<Value>)> {
    let body = json_body(&body)?;
    let form = validate_registration(&body).map_err(|e| {
        log::warn!("Rejected registration ({}): {}", e.field, e);
        HandlerError::from(e)
    })?;

    let crm = state.crm().map_err(failure)?;

    if crm.email_exists(&form.email).await.map_err(failure)? {
        log::warn!("Registration attempted for an existing email");
        return Err(HandlerError::new(
            StatusCode::CONFLICT,
            "An account with this email address already exists",
        ));
    }

    let (client_id, client_number) = create_account(crm, form).await.map_err(failure)?;
    log::info!(
        "Created client account {} ({})",
        short_id(&client_id),
        client_number
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created successfully",
            "clientId": client_id,
            "clientNumber": client_number,
        })),
    ))
}
