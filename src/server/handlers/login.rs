//! Client portal login

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::json_body;
use crate::client::dataverse::short_id;
use crate::error::{Error, SessionError};
use crate::models::ClientAccount;
use crate::models::client::MAX_LOGIN_ATTEMPTS;
use crate::server::SharedState;
use crate::server::error::{HandlerError, HandlerResult};
use crate::session::{SESSION_TTL_SECS, verify_password};
use crate::validation::validate_login;

fn internal(err: Error) -> HandlerError {
    log::error!("Client login failed: {}", err);
    HandlerError::internal("Internal server error")
}

fn rejected(err: SessionError) -> HandlerError {
    let status = match err {
        SessionError::Locked | SessionError::Inactive => StatusCode::FORBIDDEN,
        _ => StatusCode::UNAUTHORIZED,
    };
    HandlerError::new(status, err.to_string())
}

fn password_matches(account: &ClientAccount, password: &str) -> bool {
    account
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(password, hash))
}

pub async fn login(State(state): State<SharedState>, body: Bytes) -> HandlerResult<Json<Value>> {
    let body = json_body(&body)?;
    let form = validate_login(&body)?;

    let crm = state.crm().map_err(internal)?;
    let sessions = state.sessions().map_err(internal)?;

    let Some(account) = crm
        .find_client_by_email(&form.email)
        .await
        .map_err(internal)?
    else {
        log::warn!("Login attempted for an unknown email");
        return Err(rejected(SessionError::BadCredentials));
    };

    if account.is_locked() {
        log::warn!("Login refused for locked client {}", short_id(&account.id));
        return Err(rejected(SessionError::Locked));
    }
    if !account.is_active() {
        log::warn!("Login refused for inactive client {}", short_id(&account.id));
        return Err(rejected(SessionError::Inactive));
    }

    if !password_matches(&account, &form.password) {
        let attempts = account.failed_attempts() + 1;
        log::warn!(
            "Failed login {} of {} for client {}",
            attempts,
            MAX_LOGIN_ATTEMPTS,
            short_id(&account.id)
        );
        if let Err(e) = crm.record_failed_login(&account.id, attempts).await {
            log::error!("Could not record failed login: {}", e);
        }
        return Err(rejected(SessionError::BadCredentials));
    }

    if let Err(e) = crm.record_successful_login(&account.id).await {
        log::warn!("Could not record successful login: {}", e);
    }

    let token = sessions
        .issue(&account)
        .map_err(|e| internal(e.into()))?;
    log::info!("Client {} logged in", short_id(&account.id));

    Ok(Json(json!({
        "success": true,
        "token": token,
        "expiresIn": SESSION_TTL_SECS,
        "client": {
            "id": account.id,
            "name": account.name,
            "email": account.email,
            "clientNumber": account.client_number,
        },
    })))
}
