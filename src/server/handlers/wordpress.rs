//! Read-only WordPress REST proxy

use std::sync::LazyLock;

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use serde_json::json;

use super::timestamp;
use crate::error::{ApiError, Error};
use crate::server::SharedState;
use crate::server::error::{HandlerError, HandlerResult};

const DEFAULT_ENDPOINT: &str = "posts";

/// Responses may be cached by browsers and CDNs for five minutes
const CACHE_POLICY: &str = "public, max-age=300";

/// Slash-separated path segments of letters, digits, `_` and `-`
static ENDPOINT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+(/[A-Za-z0-9_-]+)*$").expect("ENDPOINT_REGEX is a valid regex pattern")
});

fn is_valid_endpoint(endpoint: &str) -> bool {
    ENDPOINT_REGEX.is_match(endpoint)
}

fn upstream_message(err: &Error) -> String {
    match err {
        Error::Api(ApiError::ServerError { message, .. }) => message.clone(),
        other => other.to_string(),
    }
}

async fn proxy(state: SharedState, endpoint: &str, query: Option<String>) -> HandlerResult<Response> {
    if !is_valid_endpoint(endpoint) {
        log::warn!("Rejected WordPress endpoint {:?}", endpoint);
        return Err(HandlerError::bad_request("Invalid WordPress endpoint"));
    }

    let result = match state.blog() {
        Ok(blog) => blog.fetch(endpoint, query.as_deref()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(data) => {
            let mut response = Json(data).into_response();
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_POLICY));
            Ok(response)
        }
        Err(e) => {
            log::error!("WordPress API error: {}", e);
            Err(HandlerError::with_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Failed to fetch WordPress data",
                    "message": upstream_message(&e),
                    "timestamp": timestamp(),
                }),
            ))
        }
    }
}

pub async fn default_endpoint(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> HandlerResult<Response> {
    proxy(state, DEFAULT_ENDPOINT, query).await
}

pub async fn endpoint(
    State(state): State<SharedState>,
    Path(endpoint): Path<String>,
    RawQuery(query): RawQuery,
) -> HandlerResult<Response> {
    proxy(state, &endpoint, query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockBlogClient;
    use crate::server::AppState;
    use crate::server::test_support::*;
    use std::sync::Arc;

    fn state_with(blog: &Arc<MockBlogClient>) -> AppState {
        AppState {
            blog: Some(blog.clone()),
            ..empty_state()
        }
    }

    #[test]
    fn test_endpoint_shapes() {
        assert!(is_valid_endpoint("posts"));
        assert!(is_valid_endpoint("posts/42"));
        assert!(is_valid_endpoint("wp_block-types"));
        assert!(!is_valid_endpoint(""));
        assert!(!is_valid_endpoint("../users"));
        assert!(!is_valid_endpoint("posts//1"));
        assert!(!is_valid_endpoint("posts/"));
        assert!(!is_valid_endpoint("posts?x=1"));
    }

    #[tokio::test]
    async fn test_default_endpoint_is_posts() {
        let blog = Arc::new(
            MockBlogClient::new()
                .with_response("posts", json!([{ "id": 1 }]))
                .await,
        );
        let response = send(state_with(&blog), get("/api/wordpress?per_page=3&_embed")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["cache-control"], CACHE_POLICY);
        assert_eq!(response_json(response).await[0]["id"], 1);

        assert_eq!(
            blog.requests().await,
            vec![("posts".to_string(), Some("per_page=3&_embed".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_nested_endpoint_passthrough() {
        let blog = Arc::new(
            MockBlogClient::new()
                .with_response("pages/7", json!({ "id": 7 }))
                .await,
        );
        let response = send(state_with(&blog), get("/api/wordpress/pages/7")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["id"], 7);
        assert_eq!(blog.requests().await[0].1, None);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500() {
        let blog = Arc::new(MockBlogClient::new());
        let response = send(state_with(&blog), get("/api/wordpress/media")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("cache-control").is_none());

        let body = response_json(response).await;
        assert_eq!(body["error"], "Failed to fetch WordPress data");
        assert_eq!(body["message"], "WordPress API responded with status: 404");
    }

    #[tokio::test]
    async fn test_missing_site_url_is_500() {
        let response = send(empty_state(), get("/api/wordpress/posts")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response_json(response).await["message"],
            "Missing configuration value: WORDPRESS_SITE_URL"
        );
    }
}
