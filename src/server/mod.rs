//! HTTP server: application state, routing and lifecycle

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::client::{
    BlogApi, CrmApi, DataverseClient, DirectoryApi, GraphClient, WordPressClient,
};
use crate::config::Config;
use crate::error::{ConfigError, Error, Result};
use crate::session::SessionKeys;

pub mod error;
mod handlers;

/// Clients and keys shared by every request.
///
/// A slot is `None` when its configuration is missing; routes that need it
/// answer with a configuration error instead of the server refusing to start.
pub struct AppState {
    pub crm: Option<Arc<dyn CrmApi>>,
    pub directory: Option<Arc<dyn DirectoryApi>>,
    pub blog: Option<Arc<dyn BlogApi>>,
    pub sessions: Option<SessionKeys>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build every client the configuration allows
    pub fn from_config(config: &Config) -> Self {
        let auth = config.auth_mode();

        let crm = match DataverseClient::from_config(config, &auth) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn CrmApi>),
            Err(err) => {
                log::warn!("CRM routes disabled: {}", err);
                None
            }
        };

        let directory = match GraphClient::from_config(config) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn DirectoryApi>),
            Err(err) => {
                log::warn!("Org chart routes disabled: {}", err);
                None
            }
        };

        let blog = match WordPressClient::from_config(config) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn BlogApi>),
            Err(err) => {
                log::warn!("WordPress routes disabled: {}", err);
                None
            }
        };

        let sessions = config.session_secret.as_deref().map(SessionKeys::new);
        if sessions.is_none() {
            log::warn!("Client portal routes disabled: CLIENT_SESSION_SECRET is not set");
        }

        Self {
            crm,
            directory,
            blog,
            sessions,
        }
    }

    pub fn crm(&self) -> Result<&dyn CrmApi> {
        self.crm
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("DATAVERSE_ENVIRONMENT_URL").into())
    }

    pub fn directory(&self) -> Result<&dyn DirectoryApi> {
        self.directory.as_deref().ok_or_else(|| {
            ConfigError::Missing("AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET").into()
        })
    }

    pub fn blog(&self) -> Result<&dyn BlogApi> {
        self.blog
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("WORDPRESS_SITE_URL").into())
    }

    pub fn sessions(&self) -> Result<&SessionKeys> {
        self.sessions
            .as_ref()
            .ok_or_else(|| ConfigError::Missing("CLIENT_SESSION_SECRET").into())
    }
}

/// Answer a bare `OPTIONS` request
async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Build the router with permissive CORS
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health::health).options(preflight))
        .route(
            "/api/contact",
            post(handlers::contact::submit).options(preflight),
        )
        .route(
            "/api/client-registration",
            post(handlers::registration::register).options(preflight),
        )
        .route(
            "/api/client-auth/login",
            post(handlers::login::login).options(preflight),
        )
        .route(
            "/api/client-documents",
            get(handlers::documents::list).options(preflight),
        )
        .route(
            "/api/client-documents/{id}/download",
            get(handlers::documents::download).options(preflight),
        )
        .route(
            "/api/orgchart",
            get(handlers::orgchart::from_query)
                .post(handlers::orgchart::from_body)
                .options(preflight),
        )
        .route(
            "/api/wordpress",
            get(handlers::wordpress::default_endpoint).options(preflight),
        )
        .route(
            "/api/wordpress/{*endpoint}",
            get(handlers::wordpress::endpoint).options(preflight),
        )
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve(config: &Config) -> Result<()> {
    let state = Arc::new(AppState::from_config(config));
    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::Io)?;

    log::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for exercising the router in-process

    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    pub fn empty_state() -> AppState {
        AppState {
            crm: None,
            directory: None,
            blog: None,
            sessions: None,
        }
    }

    pub async fn send(state: AppState, request: Request<Body>) -> Response<Body> {
        router(Arc::new(state)).oneshot(request).await.unwrap()
    }

    pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub async fn response_json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
