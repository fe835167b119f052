//! Organisation chart API
//!
//! One route, several actions. The action and its parameters may arrive in
//! the query string or, for `POST`, in a JSON body; the query string wins.

use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::timestamp;
use crate::error::Result;
use crate::orgchart::{build_forest, populate_photos};
use crate::server::SharedState;
use crate::server::error::{HandlerError, HandlerResult};

#[derive(Debug, Default, PartialEq, Eq)]
struct OrgChartRequest {
    action: Option<String>,
    user_id: Option<String>,
    include_photos: bool,
}

impl OrgChartRequest {
    fn from_parts(query: &HashMap<String, String>, body: Option<&Value>) -> Self {
        let field = |name: &str| {
            query
                .get(name)
                .map(String::as_str)
                .or_else(|| body.and_then(|b| b.get(name)).and_then(Value::as_str))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let include_photos = match query.get("includePhotos") {
            Some(flag) => flag == "true",
            None => body
                .and_then(|b| b.get("includePhotos"))
                .is_some_and(|v| v.as_bool() == Some(true) || v.as_str() == Some("true")),
        };

        Self {
            action: field("action"),
            user_id: field("userId"),
            include_photos,
        }
    }
}

enum Action {
    GetUsers,
    GetOrgChart { include_photos: bool },
    GetUserPhoto { user_id: String },
    TestConnection,
}

impl TryFrom<OrgChartRequest> for Action {
    type Error = HandlerError;

    fn try_from(request: OrgChartRequest) -> HandlerResult<Self> {
        let Some(action) = request.action else {
            return Err(HandlerError::bad_request(
                "Missing action parameter. Supported actions: getUsers, getOrgChart, getUserPhoto",
            ));
        };

        match action.as_str() {
            "getUsers" => Ok(Action::GetUsers),
            "getOrgChart" => Ok(Action::GetOrgChart {
                include_photos: request.include_photos,
            }),
            "getUserPhoto" => request
                .user_id
                .map(|user_id| Action::GetUserPhoto { user_id })
                .ok_or_else(|| HandlerError::bad_request("Missing userId parameter")),
            "testConnection" => Ok(Action::TestConnection),
            other => Err(HandlerError::bad_request(format!(
                "Unsupported action: {}. Supported actions: getUsers, getOrgChart, getUserPhoto, testConnection",
                other
            ))),
        }
    }
}

async fn run(state: &SharedState, action: Action) -> Result<Value> {
    let directory = state.directory()?;

    let body = match action {
        Action::GetUsers => {
            let users = directory.get_users().await?;
            log::info!("Returning {} directory users", users.len());
            json!({
                "success": true,
                "count": users.len(),
                "data": users,
                "timestamp": timestamp(),
            })
        }
        Action::GetOrgChart { include_photos } => {
            let users = directory.get_users().await?;
            let mut forest = build_forest(&users);
            if include_photos {
                populate_photos(&mut forest, directory).await;
            }
            log::info!(
                "Built org chart with {} roots and {} nodes from {} users",
                forest.roots.len(),
                forest.placed(),
                users.len()
            );
            json!({
                "success": true,
                "data": forest.roots,
                "totalUsers": users.len(),
                "unreachedUsers": forest.unreached,
                "timestamp": timestamp(),
            })
        }
        Action::GetUserPhoto { user_id } => {
            let photo = directory.get_user_photo(&user_id).await?;
            json!({
                "success": true,
                "data": {
                    "userId": user_id,
                    "photoUrl": photo,
                },
                "timestamp": timestamp(),
            })
        }
        Action::TestConnection => {
            let connected = directory.test_connection().await;
            let message = if connected {
                "Microsoft Graph connection is working"
            } else {
                "Microsoft Graph connection failed"
            };
            json!({
                "success": true,
                "connected": connected,
                "message": message,
                "timestamp": timestamp(),
            })
        }
    };
    Ok(body)
}

async fn respond(state: SharedState, request: OrgChartRequest) -> HandlerResult<Json<Value>> {
    let action = Action::try_from(request)?;

    run(&state, action).await.map(Json).map_err(|e| {
        log::error!("Org chart request failed: {}", e);
        HandlerError::with_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "Internal server error",
                "message": e.to_string(),
                "timestamp": timestamp(),
            }),
        )
    })
}

pub async fn from_query(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> HandlerResult<Json<Value>> {
    respond(state, OrgChartRequest::from_parts(&query, None)).await
}

pub async fn from_body(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> HandlerResult<Json<Value>> {
    let body = serde_json::from_slice::<Value>(&body).ok();
    respond(state, OrgChartRequest::from_parts(&query, body.as_ref())).await
}
