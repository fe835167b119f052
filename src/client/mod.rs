//! Remote platform clients
//!
//! One client per platform: the CRM (Dataverse Web API), the directory
//! (Microsoft Graph) and the blog (WordPress REST). Handlers only see the
//! traits below so tests can swap in the mocks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::models::{ClientAccount, ClientDocument, ClientRecord, ContactSubmission, DirectoryUser};

pub mod credential;
pub mod dataverse;
pub mod graph;
#[cfg(test)]
pub mod mock;
pub mod resolve;
pub mod wordpress;

pub use credential::{CredentialCache, TokenSource};
pub use dataverse::DataverseClient;
pub use graph::GraphClient;
pub use resolve::EntitySetResolver;
pub use wordpress::WordPressClient;

/// Outbound request timeout shared by every client
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// CRM operations
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// `true` when the entity set answers, `false` on 404
    async fn probe_entity_set(&self, name: &str) -> Result<bool>;

    /// Entity set contact submissions are written to
    async fn contact_entity_set(&self) -> Result<String>;

    /// Store a contact submission and return its record id
    async fn create_contact_submission(&self, submission: &ContactSubmission) -> Result<String>;

    /// Store a new client and return its record id
    async fn create_client_record(&self, record: &ClientRecord) -> Result<String>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    async fn client_number_exists(&self, client_number: &str) -> Result<bool>;

    async fn find_client_by_email(&self, email: &str) -> Result<Option<ClientAccount>>;

    /// Persist a failed attempt count, locking the account at the limit
    async fn record_failed_login(&self, client_id: &str, attempts: u32) -> Result<()>;

    async fn record_successful_login(&self, client_id: &str) -> Result<()>;

    async fn list_client_documents(
        &self,
        client_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<ClientDocument>>;

    async fn get_client_document(&self, document_id: &str) -> Result<Option<ClientDocument>>;

    /// Reachability check; failures are logged, not returned
    async fn test_connection(&self) -> bool;
}

/// Directory operations
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Every user with their manager id, across all pages
    async fn get_users(&self) -> Result<Vec<DirectoryUser>>;

    /// Photo as a `data:` URL, `None` when the user has none
    async fn get_user_photo(&self, user_id: &str) -> Result<Option<String>>;

    async fn test_connection(&self) -> bool;
}

/// Blog operations
#[async_trait]
pub trait BlogApi: Send + Sync {
    /// Fetch `wp/v2/{endpoint}` passing `query` through untouched
    async fn fetch(&self, endpoint: &str, query: Option<&str>) -> Result<Value>;
}

/// Build the shared HTTP client
pub fn http_client() -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Network(e.to_string()).into())
}

#[derive(Deserialize)]
struct UpstreamError {
    error: UpstreamErrorBody,
}

#[derive(Deserialize)]
struct UpstreamErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Pass 2xx responses through; map everything else to an [`ApiError`]
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let err = match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized("access token was rejected".into()),
        StatusCode::FORBIDDEN => ApiError::Forbidden,
        StatusCode::NOT_FOUND => ApiError::NotFound(url.clone()),
        StatusCode::BAD_REQUEST => {
            let message = response
                .json::<UpstreamError>()
                .await
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| "Invalid data".to_string());
            ApiError::BadRequest(message)
        }
        status => ApiError::ServerError {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("Unexpected status")
                .to_string(),
        },
    };

    log::error!("{} answered {}: {}", url, status.as_u16(), err);
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Server;

    async fn status_of(code: usize, body: &str) -> ErrorKind {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/x")
            .with_status(code)
            .with_body(body)
            .create_async()
            .await;

        let response = HttpClient::new()
            .get(format!("{}/x", server.url()))
            .send()
            .await
            .unwrap();
        check_status(response).await.unwrap_err().kind()
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(status_of(401, "").await, ErrorKind::Auth);
        assert_eq!(status_of(403, "").await, ErrorKind::Authz);
        assert_eq!(status_of(404, "").await, ErrorKind::NotFound);
        assert_eq!(status_of(500, "").await, ErrorKind::Remote);
        assert_eq!(status_of(429, "").await, ErrorKind::Remote);
    }

    #[tokio::test]
    async fn test_bad_request_keeps_upstream_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/x")
            .with_status(400)
            .with_body(r#"{"error":{"code":"0x80040237","message":"A record with matching key values already exists (duplicate)"}}"#)
            .create_async()
            .await;

        let response = HttpClient::new()
            .post(format!("{}/x", server.url()))
            .send()
            .await
            .unwrap();
        let err = check_status(response).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("already exists"));
    }
}
