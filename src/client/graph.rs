//! Microsoft Graph client for the organisation directory

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;

use super::credential::{CredentialCache, TokenSource};
use super::{DirectoryApi, check_status, http_client};
use crate::config::Config;
use crate::error::{ApiError, ConfigError, Error, Result};
use crate::models::{DirectoryUser, GraphUser};

/// Scope requested for application permissions on Graph
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

const USER_FIELDS: &str = "id,displayName,jobTitle,department,mail,userPrincipalName";

/// Largest page Graph serves for `/users`
const PAGE_SIZE: &str = "999";

pub struct GraphClient {
    http: HttpClient,
    base_url: String,
    credentials: CredentialCache,
}

#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    value: Vec<GraphUser>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

impl GraphClient {
    pub fn new(http: HttpClient, base_url: &str, credentials: CredentialCache) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Build from configuration; the directory needs a service principal
    pub fn from_config(config: &Config) -> Result<Self> {
        let sp = config
            .service_principal()
            .ok_or(ConfigError::Missing("AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET"))?;

        let http = http_client()?;
        let credentials =
            CredentialCache::new(http.clone(), TokenSource::service_principal(&sp, GRAPH_SCOPE));
        Ok(Self::new(http, &config.graph_base_url(), credentials))
    }

    /// `{base}/users/{id}/photo/$value` with the id escaped as one path segment
    fn photo_url(&self, user_id: &str) -> Result<Url> {
        let invalid = || ConfigError::Invalid(format!("Graph base URL {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["users", user_id, "photo", "$value"]);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.credentials.get_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::from)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate().await;
        }

        check_status(response).await
    }
}

#[async_trait]
impl DirectoryApi for GraphClient {
    async fn get_users(&self) -> Result<Vec<DirectoryUser>> {
        let mut users = Vec::new();
        let mut request = self.http.get(format!("{}/users", self.base_url)).query(&[
            ("$select", USER_FIELDS),
            ("$expand", "manager($select=id)"),
            ("$top", PAGE_SIZE),
        ]);
        let mut pages = 0;

        loop {
            let page: UsersPage = self.send(request).await?.json().await.map_err(|e| {
                ApiError::InvalidResponse(format!("Failed to parse users page: {}", e))
            })?;
            pages += 1;
            users.extend(page.value.into_iter().map(DirectoryUser::from));

            match page.next_link {
                Some(next) => request = self.http.get(next),
                None => break,
            }
        }

        log::info!("Fetched {} users from directory in {} page(s)", users.len(), pages);
        Ok(users)
    }

    async fn get_user_photo(&self, user_id: &str) -> Result<Option<String>> {
        let request = self.http.get(self.photo_url(user_id)?);

        let response = match self.send(request).await {
            Ok(response) => response,
            Err(Error::Api(ApiError::NotFound(_))) => return Ok(None),
            Err(err) => return Err(err),
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await.map_err(ApiError::from)?;

        Ok(Some(format!(
            "data:{};base64,{}",
            content_type,
            general_purpose::STANDARD.encode(&bytes)
        )))
    }

    async fn test_connection(&self) -> bool {
        let request = self
            .http
            .get(format!("{}/users", self.base_url))
            .query(&[("$select", "id"), ("$top", "1")]);

        match self.send(request).await {
            Ok(_) => {
                log::info!("Graph connection OK");
                true
            }
            Err(err) => {
                log::error!("Graph connection test failed: {}", err);
                false
            }
        }
    }
}
