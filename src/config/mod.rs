//! Configuration management for the Evergreen API
//!
//! Settings come from an optional YAML file and are then overridden by
//! environment variables, which is how the hosted deployment supplies them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Default listen address for `serve`
pub const DEFAULT_BIND: &str = "0.0.0.0:7071";

/// Default identity authority host
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default directory API base
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Instance metadata identity endpoint used when the platform endpoint is absent
pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CRM environment base URL, e.g. `https://org.crm6.dynamics.com`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataverse_url: Option<String>,

    /// Azure identity settings
    pub azure: AzureSettings,

    /// Blog site base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wordpress_url: Option<String>,

    /// Secret used to sign client sessions and download links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_secret: Option<String>,

    /// Listen address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Candidate entity sets for contact submissions, tried in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contact_entity_sets: Vec<String>,
}

/// Identity provider settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Platform identity endpoint (App Service / Functions)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_header: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority_host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_base_url: Option<String>,
}

/// How server-side credentials are obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Client id/secret against the tenant token endpoint
    ServicePrincipal(ServicePrincipal),
    /// Platform-supplied identity with no stored secret
    AmbientIdentity(AmbientIdentity),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrincipal {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub authority_host: String,
}

impl ServicePrincipal {
    /// Token endpoint for this tenant
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientIdentity {
    /// Platform endpoint and its secret header value; `None` means instance metadata
    pub platform: Option<(String, String)>,
    /// Selects a user-assigned identity; `None` uses the system-assigned one
    pub client_id: Option<String>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".evergreen").join("config.yaml"))
    }

    /// Load configuration from a file (if any) and overlay the process environment.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load_at(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load_from(&default)?
                } else {
                    log::debug!("No config file at {}, using environment only", default.display());
                    Self::default()
                }
            }
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup. Blank values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATAVERSE_ENVIRONMENT_URL").or_else(|| get("DATAVERSE_URL")) {
            self.dataverse_url = Some(url);
        }
        overlay(&mut self.azure.client_id, get("AZURE_CLIENT_ID"));
        overlay(&mut self.azure.client_secret, get("AZURE_CLIENT_SECRET"));
        overlay(&mut self.azure.tenant_id, get("AZURE_TENANT_ID"));
        overlay(&mut self.azure.identity_endpoint, get("IDENTITY_ENDPOINT"));
        overlay(&mut self.azure.identity_header, get("IDENTITY_HEADER"));
        overlay(&mut self.azure.authority_host, get("AZURE_AUTHORITY_HOST"));
        overlay(&mut self.azure.graph_base_url, get("GRAPH_BASE_URL"));
        overlay(&mut self.wordpress_url, get("WORDPRESS_SITE_URL"));
        overlay(&mut self.session_secret, get("CLIENT_SESSION_SECRET"));
        overlay(&mut self.bind, get("EVERGREEN_BIND"));
    }

    /// Resolve how CRM credentials are obtained.
    ///
    /// A complete service-principal triple wins; otherwise ambient identity.
    /// A lone client id selects a user-assigned managed identity.
    pub fn auth_mode(&self) -> AuthMode {
        if let Some(sp) = self.service_principal() {
            return AuthMode::ServicePrincipal(sp);
        }

        if self.has_partial_principal() {
            log::warn!(
                "Incomplete service principal (missing {}), falling back to managed identity",
                self.missing_principal_parts().join(", ")
            );
        }

        let platform = match (&self.azure.identity_endpoint, &self.azure.identity_header) {
            (Some(endpoint), Some(header)) => Some((endpoint.clone(), header.clone())),
            _ => None,
        };
        AuthMode::AmbientIdentity(AmbientIdentity {
            platform,
            client_id: self.azure.client_id.clone(),
        })
    }

    /// Environment keys of the service-principal triple that are not set
    pub fn missing_principal_parts(&self) -> Vec<&'static str> {
        let azure = &self.azure;
        [
            ("AZURE_TENANT_ID", azure.tenant_id.is_none()),
            ("AZURE_CLIENT_ID", azure.client_id.is_none()),
            ("AZURE_CLIENT_SECRET", azure.client_secret.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, missing)| missing.then_some(key))
        .collect()
    }

    /// A tenant or secret is set without the rest of the triple
    pub fn has_partial_principal(&self) -> bool {
        (self.azure.tenant_id.is_some() || self.azure.client_secret.is_some())
            && self.service_principal().is_none()
    }

    /// The service-principal triple, if all three parts are configured
    pub fn service_principal(&self) -> Option<ServicePrincipal> {
        let azure = &self.azure;
        Some(ServicePrincipal {
            tenant_id: azure.tenant_id.clone()?,
            client_id: azure.client_id.clone()?,
            client_secret: azure.client_secret.clone()?,
            authority_host: azure
                .authority_host
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
        })
    }

    /// CRM environment URL without a trailing slash
    pub fn dataverse_url(&self) -> Result<String> {
        self.dataverse_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| ConfigError::Missing("DATAVERSE_ENVIRONMENT_URL").into())
    }

    pub fn graph_base_url(&self) -> String {
        self.azure
            .graph_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string())
    }

    pub fn bind_address(&self) -> String {
        self.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string())
    }
}

fn overlay(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}
