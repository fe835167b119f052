//! Dataverse Web API client

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::credential::{CredentialCache, TokenSource};
use super::resolve::EntitySetResolver;
use super::{CrmApi, check_status, http_client};
use crate::config::{AuthMode, Config};
use crate::error::{ApiError, Error, Result};
use crate::models::client::MAX_LOGIN_ATTEMPTS;
use crate::models::{ClientAccount, ClientDocument, ClientRecord, ContactSubmission};

/// Web API path appended to the environment URL
pub const API_PATH: &str = "/api/data/v9.2";

const CLIENTS_SET: &str = "e365_clients";
const DOCUMENTS_SET: &str = "e365_clientdocuments";

const ACCOUNT_COLUMNS: &str = "e365_clientid,e365_name,e365_email,e365_passwordhash,\
e365_clientnumber,e365_status,e365_loginattempts,e365_accountlocked";

const DOCUMENT_COLUMNS: &str =
    "e365_clientdocumentid,e365_name,e365_category,e365_fileurl,e365_filesize,createdon,_e365_client_value";

/// CRM client for one environment
pub struct DataverseClient {
    http: HttpClient,
    base_url: String,
    credentials: CredentialCache,
    resolver: EntitySetResolver,
}

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

impl DataverseClient {
    /// Create a client for `environment_url` using the given credentials
    pub fn new(http: HttpClient, environment_url: &str, credentials: CredentialCache) -> Self {
        Self {
            http,
            base_url: format!("{}{}", environment_url.trim_end_matches('/'), API_PATH),
            credentials,
            resolver: EntitySetResolver::default(),
        }
    }

    /// Build from configuration, picking the token flow from the auth mode
    pub fn from_config(config: &Config, auth: &AuthMode) -> Result<Self> {
        let environment_url = config.dataverse_url()?;
        let http = http_client()?;

        let source = match auth {
            AuthMode::ServicePrincipal(sp) => {
                TokenSource::service_principal(sp, format!("{}/.default", environment_url))
            }
            AuthMode::AmbientIdentity(identity) => {
                TokenSource::managed_identity(identity, environment_url.clone())
            }
        };

        let credentials = CredentialCache::new(http.clone(), source);
        let mut client = Self::new(http, &environment_url, credentials);
        if !config.contact_entity_sets.is_empty() {
            client = client.with_resolver(EntitySetResolver::new(
                config.contact_entity_sets.iter().cloned(),
            ));
        }
        Ok(client)
    }

    /// Replace the contact entity-set candidates
    pub fn with_resolver(mut self, resolver: EntitySetResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn odata_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("odata-maxversion", HeaderValue::from_static("4.0"));
        headers.insert("odata-version", HeaderValue::from_static("4.0"));
        headers
    }

    /// Attach credentials and headers, send, and map the status
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.credentials.get_token().await?;
        let response = request
            .headers(Self::odata_headers())
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::from)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate().await;
        }

        check_status(response).await
    }

    async fn query<T: DeserializeOwned>(
        &self,
        entity_set: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let request = self.http.get(self.url(entity_set)).query(params);
        let response = self.send(request).await?;
        let collection: Collection<T> = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {} response: {}", entity_set, e))
        })?;
        Ok(collection.value)
    }

    async fn exists(&self, entity_set: &str, id_column: &str, filter: String) -> Result<bool> {
        let rows: Vec<serde_json::Value> = self
            .query(
                entity_set,
                &[
                    ("$filter", filter),
                    ("$select", id_column.to_string()),
                    ("$top", "1".to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn create(&self, entity_set: &str, body: &impl serde::Serialize) -> Result<String> {
        let request = self.http.post(self.url(entity_set)).json(body);
        let response = self.send(request).await?;

        let header = response
            .headers()
            .get("OData-EntityId")
            .and_then(|v| v.to_str().ok());
        extract_entity_id(header)
    }

    async fn update(&self, entity_set: &str, id: &str, body: serde_json::Value) -> Result<()> {
        let request = self
            .http
            .patch(self.url(&format!("{}({})", entity_set, id)))
            .json(&body);
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl CrmApi for DataverseClient {
    async fn probe_entity_set(&self, name: &str) -> Result<bool> {
        let request = self.http.get(self.url(name)).query(&[("$top", "1")]);
        match self.send(request).await {
            Ok(_) => Ok(true),
            Err(Error::Api(ApiError::NotFound(_))) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn contact_entity_set(&self) -> Result<String> {
        self.resolver.resolve(self).await
    }

    async fn create_contact_submission(&self, submission: &ContactSubmission) -> Result<String> {
        let entity_set = self.contact_entity_set().await?;
        log::info!("Creating contact submission in {}", entity_set);

        let id = self.create(&entity_set, &submission.to_record()).await?;
        log::info!("Created contact submission {}", short_id(&id));
        Ok(id)
    }

    async fn create_client_record(&self, record: &ClientRecord) -> Result<String> {
        match self.create(CLIENTS_SET, record).await {
            Ok(id) => {
                log::info!("Created client record {}", short_id(&id));
                Ok(id)
            }
            Err(Error::Api(ApiError::BadRequest(message)))
                if message.to_lowercase().contains("duplicate") =>
            {
                Err(ApiError::Duplicate(message).into())
            }
            Err(err) => Err(err),
        }
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let filter = format!("e365_email eq '{}'", escape_literal(&email.to_lowercase()));
        self.exists(CLIENTS_SET, "e365_clientid", filter).await
    }

    async fn client_number_exists(&self, client_number: &str) -> Result<bool> {
        let filter = format!("e365_clientnumber eq '{}'", escape_literal(client_number));
        self.exists(CLIENTS_SET, "e365_clientid", filter).await
    }

    async fn find_client_by_email(&self, email: &str) -> Result<Option<ClientAccount>> {
        let filter = format!("e365_email eq '{}'", escape_literal(&email.to_lowercase()));
        let accounts: Vec<ClientAccount> = self
            .query(
                CLIENTS_SET,
                &[
                    ("$filter", filter),
                    ("$select", ACCOUNT_COLUMNS.to_string()),
                    ("$top", "1".to_string()),
                ],
            )
            .await?;
        Ok(accounts.into_iter().next())
    }

    async fn record_failed_login(&self, client_id: &str, attempts: u32) -> Result<()> {
        let locked = attempts >= MAX_LOGIN_ATTEMPTS;
        if locked {
            log::warn!("Locking client {} after {} failed logins", short_id(client_id), attempts);
        }
        self.update(
            CLIENTS_SET,
            client_id,
            json!({
                "e365_loginattempts": attempts,
                "e365_accountlocked": locked,
            }),
        )
        .await
    }

    async fn record_successful_login(&self, client_id: &str) -> Result<()> {
        self.update(
            CLIENTS_SET,
            client_id,
            json!({
                "e365_loginattempts": 0,
                "e365_lastlogindate": Utc::now().to_rfc3339(),
            }),
        )
        .await
    }

    async fn list_client_documents(
        &self,
        client_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<ClientDocument>> {
        let mut filter = format!("_e365_client_value eq {}", escape_literal(client_id));
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            filter.push_str(&format!(" and contains(e365_name,'{}')", escape_literal(term)));
        }

        self.query(
            DOCUMENTS_SET,
            &[
                ("$filter", filter),
                ("$select", DOCUMENT_COLUMNS.to_string()),
                ("$orderby", "createdon desc".to_string()),
            ],
        )
        .await
    }

    async fn get_client_document(&self, document_id: &str) -> Result<Option<ClientDocument>> {
        if !is_record_id(document_id) {
            return Ok(None);
        }

        let request = self
            .http
            .get(self.url(&format!("{}({})", DOCUMENTS_SET, document_id)))
            .query(&[("$select", DOCUMENT_COLUMNS)]);

        match self.send(request).await {
            Ok(response) => {
                let document = response.json::<ClientDocument>().await.map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse document: {}", e))
                })?;
                Ok(Some(document))
            }
            Err(Error::Api(ApiError::NotFound(_))) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn test_connection(&self) -> bool {
        match self.contact_entity_set().await {
            Ok(entity_set) => {
                log::info!("Dataverse connection OK ({})", entity_set);
                true
            }
            Err(err) => {
                log::error!("Dataverse connection test failed: {}", err);
                false
            }
        }
    }
}

/// Pull the record id out of an `OData-EntityId` header value.
///
/// The header looks like `https://org.crm.dynamics.com/api/data/v9.2/e365_clients(<id>)`.
pub fn extract_entity_id(header: Option<&str>) -> Result<String> {
    let url = header.ok_or_else(|| {
        ApiError::InvalidEntityId("No entity ID returned from Dataverse".to_string())
    })?;

    url.strip_suffix(')')
        .and_then(|rest| rest.rsplit_once('('))
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty() && !id.contains(')'))
        .map(str::to_string)
        .ok_or_else(|| ApiError::InvalidEntityId(url.to_string()).into())
}

/// Quote-escape a value for an OData string literal
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn is_record_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// First eight characters of an id, for logs
pub(crate) fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}
