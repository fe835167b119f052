//! Bearer token acquisition and caching
//!
//! Each remote client owns one [`CredentialCache`]. A cached token is reused
//! until five minutes before the provider says it expires.
//!
//! The check-then-refresh window is not atomic: two callers that both find
//! the cache empty will both fetch a token and the last write wins.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::{AmbientIdentity, IMDS_ENDPOINT, ServicePrincipal};
use crate::error::{ApiError, Result};

/// Safety margin subtracted from every provider-reported expiry
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

const PLATFORM_API_VERSION: &str = "2019-08-01";
const IMDS_API_VERSION: &str = "2018-02-01";

/// Generic failure message when the provider gives nothing more useful
const TOKEN_UNAVAILABLE: &str = "Unable to obtain access token";

/// A bearer token and the instant it stops being used
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Build from a relative lifetime, applying the safety margin
    pub fn from_expires_in(token: String, issued_at: DateTime<Utc>, expires_in: i64) -> Self {
        Self {
            token,
            expires_at: issued_at + Duration::seconds(expires_in - EXPIRY_MARGIN_SECS),
        }
    }

    /// Build from an absolute Unix expiry, applying the safety margin
    pub fn from_expires_on(token: String, expires_on: i64) -> Self {
        let expires_at = DateTime::from_timestamp(expires_on - EXPIRY_MARGIN_SECS, 0)
            .unwrap_or_else(Utc::now);
        Self { token, expires_at }
    }

    pub fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Where tokens come from
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// OAuth2 client-credentials grant
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: String,
    },
    /// Hosting platform or instance metadata identity
    ManagedIdentity {
        identity: AmbientIdentity,
        resource: String,
    },
}

impl TokenSource {
    pub fn service_principal(sp: &ServicePrincipal, scope: impl Into<String>) -> Self {
        TokenSource::ClientCredentials {
            token_url: sp.token_url(),
            client_id: sp.client_id.clone(),
            client_secret: sp.client_secret.clone(),
            scope: scope.into(),
        }
    }

    pub fn managed_identity(identity: &AmbientIdentity, resource: impl Into<String>) -> Self {
        TokenSource::ManagedIdentity {
            identity: identity.clone(),
            resource: resource.into(),
        }
    }

    /// Short label for logs and the status command
    pub fn describe(&self) -> &'static str {
        match self {
            TokenSource::ClientCredentials { .. } => "service principal",
            TokenSource::ManagedIdentity {
                identity: AmbientIdentity { platform: Some(_), .. },
                ..
            } => "managed identity (platform endpoint)",
            TokenSource::ManagedIdentity { .. } => "managed identity (instance metadata)",
        }
    }
}

#[derive(Deserialize)]
struct ClientCredentialsResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct ManagedIdentityResponse {
    access_token: String,
    expires_on: NumberOrString,
}

/// Identity endpoints disagree on whether timestamps are quoted
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

impl NumberOrString {
    fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error_description: Option<String>,
}

/// Token cache owned by a single remote client
pub struct CredentialCache {
    http: HttpClient,
    source: TokenSource,
    cached: Arc<RwLock<Option<Credential>>>,
}

impl CredentialCache {
    pub fn new(http: HttpClient, source: TokenSource) -> Self {
        Self {
            http,
            source,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn source(&self) -> &TokenSource {
        &self.source
    }

    /// Return a usable bearer token, fetching a new one when stale or absent
    pub async fn get_token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(credential) = cached.as_ref().filter(|c| c.is_fresh()) {
                return Ok(credential.token.clone());
            }
        }

        log::debug!("Refreshing access token via {}", self.source.describe());
        let credential = self.acquire().await?;
        let token = credential.token.clone();

        *self.cached.write().await = Some(credential);

        Ok(token)
    }

    /// Drop the cached credential so the next call refreshes
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn acquire(&self) -> Result<Credential> {
        match &self.source {
            TokenSource::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                scope,
            } => {
                let params = [
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("scope", scope.as_str()),
                ];

                let issued_at = Utc::now();
                let response = self
                    .http
                    .post(token_url)
                    .form(&params)
                    .send()
                    .await
                    .map_err(token_unavailable)?;

                let body: ClientCredentialsResponse = read_token_response(response).await?;
                let expires_in = body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);

                log::info!("Obtained access token, expires in {}s", expires_in);
                Ok(Credential::from_expires_in(
                    body.access_token,
                    issued_at,
                    expires_in,
                ))
            }
            TokenSource::ManagedIdentity { identity, resource } => {
                let mut request = match &identity.platform {
                    Some((endpoint, header)) => self
                        .http
                        .get(endpoint)
                        .header("X-IDENTITY-HEADER", header)
                        .query(&[
                            ("api-version", PLATFORM_API_VERSION),
                            ("resource", resource.as_str()),
                        ]),
                    None => self
                        .http
                        .get(IMDS_ENDPOINT)
                        .header("Metadata", "true")
                        .query(&[
                            ("api-version", IMDS_API_VERSION),
                            ("resource", resource.as_str()),
                        ]),
                };
                if let Some(client_id) = &identity.client_id {
                    request = request.query(&[("client_id", client_id.as_str())]);
                }

                let response = request.send().await.map_err(token_unavailable)?;
                let body: ManagedIdentityResponse = read_token_response(response).await?;
                let expires_on = body
                    .expires_on
                    .as_i64()
                    .ok_or_else(|| ApiError::Unauthorized(TOKEN_UNAVAILABLE.to_string()))?;

                log::info!("Obtained managed identity token");
                Ok(Credential::from_expires_on(body.access_token, expires_on))
            }
        }
    }
}

fn token_unavailable(err: reqwest::Error) -> ApiError {
    log::error!("Token request failed: {}", err);
    ApiError::Unauthorized(TOKEN_UNAVAILABLE.to_string())
}

async fn read_token_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();

    if status == StatusCode::BAD_REQUEST {
        let description = response
            .json::<TokenErrorResponse>()
            .await
            .ok()
            .and_then(|e| e.error_description)
            .unwrap_or_else(|| TOKEN_UNAVAILABLE.to_string());
        log::error!("Token endpoint rejected credentials: {}", description);
        return Err(ApiError::Unauthorized(description).into());
    }

    if !status.is_success() {
        log::error!("Token endpoint answered {}", status);
        return Err(ApiError::Unauthorized(TOKEN_UNAVAILABLE.to_string()).into());
    }

    response.json::<T>().await.map_err(|e| {
        log::error!("Unreadable token response: {}", e);
        ApiError::Unauthorized(TOKEN_UNAVAILABLE.to_string()).into()
    })
}
