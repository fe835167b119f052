//! Error types for the Evergreen API

use thiserror::Error;

/// Result type alias for Evergreen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Coarse classification used by HTTP handlers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input was malformed (or the upstream rejected it as such)
    Validation,
    /// Credential acquisition or verification failed
    Auth,
    /// Authenticated but not allowed
    Authz,
    /// Uniqueness constraint violated
    Duplicate,
    /// Upstream answered 2xx with something we cannot interpret
    Format,
    /// Requested record does not exist
    NotFound,
    /// Required deployment configuration is absent
    Config,
    /// Any other upstream or local failure
    Remote,
}

impl Error {
    /// Classify this error for response mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api(api) => api.kind(),
            Error::Config(_) => ErrorKind::Config,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Session(SessionError::Signing(_)) => ErrorKind::Config,
            Error::Session(_) => ErrorKind::Auth,
            Error::Io(_) | Error::Json(_) | Error::Other(_) => ErrorKind::Remote,
        }
    }
}

/// Failures raised while talking to a remote platform
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Authorization failed: insufficient permissions")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Invalid entity id format: {0}")]
    InvalidEntityId(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Classify a remote failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized(_) => ErrorKind::Auth,
            ApiError::Forbidden => ErrorKind::Authz,
            ApiError::BadRequest(_) => ErrorKind::Validation,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Duplicate(_) => ErrorKind::Duplicate,
            ApiError::InvalidEntityId(_) | ApiError::InvalidResponse(_) => ErrorKind::Format,
            ApiError::ServerError { .. } | ApiError::Network(_) => ErrorKind::Remote,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to remote service".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("No entity set found among candidates: {0}")]
    EntitySetUnresolved(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// First violated form rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Field the rule applies to
    pub field: &'static str,
    /// Human-readable message returned to the caller
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Client session failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Authentication required")]
    Missing,

    #[error("Invalid or expired token")]
    Invalid,

    #[error("Invalid email or password")]
    BadCredentials,

    #[error("Account is locked due to too many failed login attempts")]
    Locked,

    #[error("Account is not active")]
    Inactive,

    #[error("Document not found or access denied")]
    AccessDenied,

    #[error("Signing failed: {0}")]
    Signing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_kinds() {
        assert_eq!(
            ApiError::Unauthorized("x".into()).kind(),
            ErrorKind::Auth
        );
        assert_eq!(ApiError::Forbidden.kind(), ErrorKind::Authz);
        assert_eq!(
            ApiError::BadRequest("bad".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ApiError::InvalidEntityId("h".into()).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            ApiError::Network("down".into()).kind(),
            ErrorKind::Remote
        );
    }

    #[test]
    fn test_top_level_kind_delegates() {
        let err: Error = ApiError::Duplicate("email".into()).into();
        assert_eq!(err.kind(), ErrorKind::Duplicate);

        let err: Error = ConfigError::Missing("DATAVERSE_ENVIRONMENT_URL").into();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err: Error = ValidationError::new("name", "Name is required").into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Name is required");

        let err: Error = SessionError::Invalid.into();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_unauthorized_message_keeps_detail() {
        let err = ApiError::Unauthorized("invalid_client".into());
        assert_eq!(err.to_string(), "Authentication failed: invalid_client");
    }
}
