//! `/api/graphdb`: a thin, stateless pass-through to the triple store.
//!
//! Successful answers keep the store's status and JSON body. A non-success
//! status from the store becomes `{"error": "GraphDB error: <status text>"}`
//! with the same status; a failed call becomes a 500 carrying the message.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LdmError, Result};
use crate::server::AppState;
use crate::upstream::UpstreamReply;

pub const DEFAULT_ENDPOINT: &str = "repositories";

#[derive(Deserialize, Debug, Default)]
pub struct ProxyParams {
    pub endpoint: Option<String>,
    pub repo: Option<String>,
    pub query: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY)
}

fn respond(result: Result<UpstreamReply>, failure: &str, started: Instant) -> Response {
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(reply) => {
            info!(ms, status = reply.status, "proxy call complete");
            (status(reply.status), Json(reply.body)).into_response()
        }
        Err(e) => {
            let (code, error) = match &e {
                LdmError::Upstream { status: upstream, .. } => (*upstream, e.to_string()),
                LdmError::InvalidIdentifier(_) => (400, e.to_string()),
                LdmError::Transport(msg) | LdmError::Decode(msg) | LdmError::Config(msg) => {
                    (500, format!("{failure}: {msg}"))
                }
                other => (other.status_code(), other.to_string()),
            };
            warn!(ms, code, %error, "proxy call failed");
            (status(code), Json(ErrorBody { error })).into_response()
        }
    }
}

/// `GET /api/graphdb?endpoint=&repo=&query=`
pub async fn forward_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let started = Instant::now();
    let upstream = state.upstream();
    let result = match (params.repo.as_deref(), params.query.as_deref()) {
        (Some(repo), Some(query)) => upstream.get_query(repo, query).await,
        _ => {
            let endpoint = params.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
            upstream.get(endpoint).await
        }
    };
    respond(result, "Connection failed", started)
}

/// `POST /api/graphdb?repo=` with a form-encoded `query=` body.
pub async fn forward_post(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProxyParams>,
    body: String,
) -> Response {
    let started = Instant::now();
    let repo = params
        .repo
        .unwrap_or_else(|| state.settings().default_repository.clone());
    info!(%repo, bytes = body.len(), "proxying query");
    let result = state.upstream().post_raw(&repo, body).await;
    respond(result, "Query failed", started)
}
