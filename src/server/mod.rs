//! HTTP surface for the administration UI.
//!
//! | Method | Path | |
//! |--------|------|-|
//! | POST | `/api/auth` | password check |
//! | GET, POST | `/api/config` | read or replace the stored config |
//! | GET | `/api/accounts/:account/projects` | list projects |
//! | GET | `/api/accounts/:account/projects/:project/domains` | list custom domains |
//! | POST | `/api/accounts/:account/projects/:project/domains` | attach a domain |
//! | DELETE | `/api/accounts/:account/projects/:project/domains/:domain` | detach a domain |
//!
//! Cloudflare credentials come from the `X-Pages-Token`, `X-Zone-Token` and
//! `X-Account-Id` headers, or from the stored config when
//! [`CredentialSource::Stored`](crate::config::CredentialSource::Stored) is
//! selected.

mod handlers;

use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::cloudflare::UpstreamError;
use crate::config::ConfigError;
use crate::orchestrator::{ConfigurationError, Orchestrator};

/// Header carrying the Pages token.
pub const PAGES_TOKEN_HEADER: &str = "x-pages-token";
/// Header carrying the generic zone token.
pub const ZONE_TOKEN_HEADER: &str = "x-zone-token";
/// Header overriding the account in the path.
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Shared state for every route.
#[derive(Debug, Clone)]
pub struct AppState {
    orchestrator: Orchestrator,
    password: Arc<str>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, password: impl Into<Arc<str>>) -> Self {
        Self {
            orchestrator,
            password: password.into(),
        }
    }
}

/// Builds the router with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(ACCOUNT_ID_HEADER),
            HeaderName::from_static(PAGES_TOKEN_HEADER),
            HeaderName::from_static(ZONE_TOKEN_HEADER),
        ]);

    Router::new()
        .route("/api/auth", post(handlers::auth))
        .route(
            "/api/config",
            get(handlers::get_config).post(handlers::put_config),
        )
        .route("/api/accounts/:account/projects", get(handlers::list_projects))
        .route(
            "/api/accounts/:account/projects/:project/domains",
            get(handlers::list_domains).post(handlers::attach_domain),
        )
        .route(
            "/api/accounts/:account/projects/:project/domains/:domain",
            delete(handlers::detach_domain),
        )
        .fallback(handlers::invalid_route)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Errors a route can end in.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A config blob submitted by the client does not parse.
    #[error("invalid config: {0}")]
    InvalidConfig(ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Configuration(err) => {
                error_response(StatusCode::UNAUTHORIZED, &err.to_string())
            }
            ServerError::Config(err) => {
                warn!(error = %err, "config store failure");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
            }
            ServerError::InvalidConfig(err) => {
                error_response(StatusCode::BAD_REQUEST, &err.to_string())
            }
            ServerError::Upstream(UpstreamError::Api { status, errors }) => (
                upstream_status(status),
                Json(json!({ "success": false, "errors": errors })),
            )
                .into_response(),
            ServerError::Upstream(err) => {
                warn!(error = %err, "upstream failure");
                error_response(StatusCode::BAD_GATEWAY, &err.to_string())
            }
        }
    }
}

/// `{success: false, error}` with the given status.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// Maps an upstream status onto ours, defaulting to 502 if it is not valid.
pub(crate) fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}
