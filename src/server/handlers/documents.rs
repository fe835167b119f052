//! Client portal documents: listing, search and signed downloads

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use super::bearer_token;
use crate::client::CrmApi;
use crate::client::dataverse::short_id;
use crate::error::{ErrorKind, SessionError};
use crate::server::SharedState;
use crate::server::error::{HandlerError, HandlerResult};
use crate::session::{DOWNLOAD_LINK_TTL_SECS, SessionClaims, SessionKeys, sign_download_url};

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    #[serde(default)]
    search: Option<String>,
}

/// Session-checked CRM access for one request
struct Portal<'a> {
    crm: &'a dyn CrmApi,
    sessions: &'a SessionKeys,
    claims: SessionClaims,
}

fn authenticate<'a>(state: &'a SharedState, headers: &HeaderMap) -> HandlerResult<Portal<'a>> {
    let Some(token) = bearer_token(headers) else {
        return Err(HandlerError::unauthorized(SessionError::Missing.to_string()));
    };

    let configured = state.sessions().and_then(|s| Ok((s, state.crm()?)));
    let (sessions, crm) = configured.map_err(|e| {
        log::error!("Document routes unavailable: {}", e);
        HandlerError::internal("Server configuration error")
    })?;

    let claims = sessions
        .verify(token)
        .map_err(|e| HandlerError::unauthorized(e.to_string()))?;

    Ok(Portal {
        crm,
        sessions,
        claims,
    })
}

pub async fn list(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<DocumentQuery>,
) -> HandlerResult<Json<Value>> {
    let portal = authenticate(&state, &headers)?;
    let client_id = portal.claims.sub.as_str();
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let documents = portal
        .crm
        .list_client_documents(client_id, search)
        .await
        .map_err(|e| {
            log::error!("Document lookup for {} failed: {}", short_id(client_id), e);
            HandlerError::internal(if search.is_some() {
                "Failed to search documents"
            } else {
                "Failed to load documents"
            })
        })?;

    log::info!(
        "Returning {} documents for client {}",
        documents.len(),
        short_id(client_id)
    );

    let count = documents.len();
    let body = if search.is_some() {
        json!({
            "success": true,
            "documents": documents,
            "count": count,
        })
    } else {
        json!({
            "success": true,
            "documents": documents,
            "count": count,
            "client": {
                "name": portal.claims.name,
                "clientNumber": portal.claims.client_number,
            },
        })
    };
    Ok(Json(body))
}

pub async fn download(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> HandlerResult<Json<Value>> {
    let portal = authenticate(&state, &headers)?;
    let client_id = portal.claims.sub.as_str();
    let denied = || HandlerError::forbidden(SessionError::AccessDenied.to_string());

    let document = match portal.crm.get_client_document(&document_id).await {
        Ok(document) => document,
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            log::error!("Document fetch failed: {}", e);
            return Err(HandlerError::internal("Internal server error"));
        }
    };

    let Some(document) = document.filter(|d| d.is_owned_by(client_id)) else {
        log::warn!(
            "Client {} denied document {}",
            short_id(client_id),
            short_id(&document_id)
        );
        return Err(denied());
    };
    let Some(file_url) = document.file_url.as_deref() else {
        log::warn!("Document {} has no file", short_id(&document.id));
        return Err(denied());
    };

    let expires = Utc::now().timestamp() + DOWNLOAD_LINK_TTL_SECS;
    let url = sign_download_url(portal.sessions.secret(), file_url, &document.id, expires)
        .map_err(|e| {
            log::error!("Could not sign download link: {}", e);
            HandlerError::internal("Internal server error")
        })?;

    log::info!(
        "Issued download link for document {} to client {}",
        short_id(&document.id),
        short_id(client_id)
    );

    Ok(Json(json!({
        "success": true,
        "downloadUrl": url,
        "expiresIn": "1 hour",
    })))
}
