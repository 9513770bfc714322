use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{
    error_response, upstream_status, AppState, ServerError, ACCOUNT_ID_HEADER, PAGES_TOKEN_HEADER,
    ZONE_TOKEN_HEADER,
};
use crate::config::{CredentialSource, UserConfig};
use crate::orchestrator::{AttachRequest, Credentials};

#[derive(Debug, Deserialize)]
pub(super) struct AuthRequest {
    #[serde(default)]
    password: Option<String>,
}

pub(super) async fn auth(
    State(state): State<AppState>,
    Json(request): Json<AuthRequest>,
) -> Response {
    if request.password.as_deref() == Some(&*state.password) {
        (StatusCode::OK, Json(json!({ "success": true }))).into_response()
    } else {
        warn!("rejected login attempt");
        (StatusCode::UNAUTHORIZED, Json(json!({ "success": false }))).into_response()
    }
}

pub(super) async fn get_config(State(state): State<AppState>) -> Result<Response, ServerError> {
    let config = state.orchestrator.store().get().await?;
    Ok(Json(json!({ "success": true, "config": config })).into_response())
}

pub(super) async fn put_config(
    State(state): State<AppState>,
    Json(config): Json<Value>,
) -> Result<Response, ServerError> {
    // Reject blobs whose known keys have the wrong shape before storing.
    UserConfig::from_blob(Some(&config)).map_err(ServerError::InvalidConfig)?;
    state.orchestrator.store().put(config).await?;
    info!("config updated");
    Ok(Json(json!({ "success": true })).into_response())
}

pub(super) async fn list_projects(
    State(state): State<AppState>,
    Path(account): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let context = RequestContext::load(&state, &headers, &account).await?;
    let projects = state
        .orchestrator
        .client()
        .list_projects(
            &context.account_id,
            state.orchestrator.config().pagination,
            context.credentials.pages(),
        )
        .await?;

    let count = projects.len();
    Ok(Json(json!({
        "success": true,
        "result": projects,
        "result_info": { "count": count, "total_count": count },
    }))
    .into_response())
}

pub(super) async fn list_domains(
    State(state): State<AppState>,
    Path((account, project)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let context = RequestContext::load(&state, &headers, &account).await?;
    let response = state
        .orchestrator
        .client()
        .list_domains(&context.account_id, &project, context.credentials.pages())
        .await?;
    Ok((upstream_status(response.status), Json(response.body)).into_response())
}

pub(super) async fn attach_domain(
    State(state): State<AppState>,
    Path((account, project)): Path<(String, String)>,
    headers: HeaderMap,
    payload: Result<Json<AttachRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return Ok(error_response(StatusCode::BAD_REQUEST, &rejection.body_text()));
        }
    };
    let context = RequestContext::load(&state, &headers, &account).await?;
    let outcome = state
        .orchestrator
        .attach(
            &context.account_id,
            &project,
            &request,
            &context.credentials,
            &context.config.zones,
        )
        .await;
    Ok((upstream_status(outcome.status), Json(outcome.to_json())).into_response())
}

pub(super) async fn detach_domain(
    State(state): State<AppState>,
    Path((account, project, domain)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let context = RequestContext::load(&state, &headers, &account).await?;
    let outcome = state
        .orchestrator
        .detach(
            &context.account_id,
            &project,
            &domain,
            &context.credentials,
            &context.config.zones,
        )
        .await;
    Ok((upstream_status(outcome.status), Json(outcome.to_json())).into_response())
}

pub(super) async fn invalid_route() -> Response {
    error_response(StatusCode::BAD_REQUEST, "invalid route")
}

/// Everything a Cloudflare route needs, read once per request.
struct RequestContext {
    account_id: String,
    credentials: Credentials,
    config: UserConfig,
}

impl RequestContext {
    async fn load(
        state: &AppState,
        headers: &HeaderMap,
        path_account: &str,
    ) -> Result<Self, ServerError> {
        let config = state.orchestrator.load_config().await?;
        let stored = state.orchestrator.config().credential_source == CredentialSource::Stored;

        let pick = |header: &str, fallback: &Option<String>| {
            header_value(headers, header).or_else(|| {
                if stored {
                    fallback.clone().filter(|v| !v.is_empty())
                } else {
                    None
                }
            })
        };

        let credentials = Credentials::new(
            pick(PAGES_TOKEN_HEADER, &config.pages_token),
            pick(ZONE_TOKEN_HEADER, &config.zone_token),
        )?;
        let account_id =
            pick(ACCOUNT_ID_HEADER, &config.account_id).unwrap_or_else(|| path_account.to_string());

        Ok(Self {
            account_id,
            credentials,
            config,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
