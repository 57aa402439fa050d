use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::client::GraphDbClient;
use crate::config::{Settings, TemporalSourceKind};
use crate::error::{LdmError, Result};
use crate::model::{ClassDetail, ClassInfo, Overview, Stats, SubjectDetail, SubjectNode, TemporalTriple, Triple};
use crate::proxy::{self, ErrorBody};
use crate::temporal::{SampleHistory, StoreHistory, TemporalSource, DEFAULT_HISTORY_LIMIT};
use crate::upstream::{check_repository, DirectExecutor, SparqlExecutor, Upstream};

// ------------- AppState -------------
pub struct AppState {
    settings: Settings,
    upstream: Arc<Upstream>,
    client: GraphDbClient,
}

impl AppState {
    /// Wires the store transport, the executor and the temporal source from `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        check_repository(&settings.default_repository)
            .map_err(|e| LdmError::Config(e.to_string()))?;
        let upstream = Arc::new(Upstream::new(&settings)?);
        let executor: Arc<dyn SparqlExecutor> =
            Arc::new(DirectExecutor::new(Arc::clone(&upstream), &settings.default_repository));
        let temporal: Arc<dyn TemporalSource> = match settings.temporal_source {
            TemporalSourceKind::Store => Arc::new(StoreHistory::new(Arc::clone(&executor))),
            TemporalSourceKind::Sample => Arc::new(SampleHistory::default()),
        };
        let client = GraphDbClient::new(executor)
            .with_temporal(temporal)
            .with_root_marker(settings.root_marker());
        Ok(Self { settings, upstream, client })
    }
    /// Uses `client` for the dashboard routes instead of one built from `settings`.
    pub fn with_client(settings: Settings, client: GraphDbClient) -> Result<Self> {
        let upstream = Arc::new(Upstream::new(&settings)?);
        Ok(Self { settings, upstream, client })
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }
    pub fn client(&self) -> &GraphDbClient {
        &self.client
    }
}

impl IntoResponse for LdmError {
    fn into_response(self) -> Response {
        let code = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (code, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

async fn timed<T>(route: &'static str, work: impl Future<Output = Result<T>>) -> Result<T> {
    let started = Instant::now();
    let result = work.await;
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    match &result {
        Ok(_) => info!(route, ms, "request complete"),
        Err(e) => warn!(route, ms, error = %e, "request failed"),
    }
    result
}

// ------------- Dashboard routes -------------
#[derive(Deserialize)]
pub struct UriParams {
    pub uri: String,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub subject: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct AsOfParams {
    pub timestamp: String,
}

async fn classes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ClassInfo>>> {
    timed("classes", state.client().list_classes()).await.map(Json)
}

async fn class_detail(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UriParams>,
) -> Result<Json<ClassDetail>> {
    timed("class_detail", state.client().class_details(&params.uri)).await.map(Json)
}

async fn hierarchy(State(state): State<Arc<AppState>>) -> Result<Json<Option<SubjectNode>>> {
    timed("hierarchy", state.client().subject_hierarchy()).await.map(Json)
}

async fn subject_detail(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UriParams>,
) -> Result<Json<SubjectDetail>> {
    timed("subject_detail", state.client().subject_details(&params.uri)).await.map(Json)
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<TemporalTriple>>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let subject = params.subject.as_deref().filter(|s| !s.is_empty());
    timed("history", state.client().temporal_history(subject, limit)).await.map(Json)
}

async fn as_of(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AsOfParams>,
) -> Result<Json<Vec<Triple>>> {
    timed("as_of", state.client().as_of_text(&params.timestamp)).await.map(Json)
}

async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<Stats>> {
    timed("stats", state.client().stats()).await.map(Json)
}

async fn overview(State(state): State<Arc<AppState>>) -> Result<Json<Overview>> {
    timed("overview", state.client().overview()).await.map(Json)
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    Router::new()
        .route("/api/graphdb", get(proxy::forward_get).post(proxy::forward_post))
        .route("/api/classes", get(classes))
        .route("/api/classes/detail", get(class_detail))
        .route("/api/subjects/hierarchy", get(hierarchy))
        .route("/api/subjects/detail", get(subject_detail))
        .route("/api/temporal/history", get(history))
        .route("/api/temporal/as-of", get(as_of))
        .route("/api/stats", get(stats))
        .route("/api/overview", get(overview))
        .layer(cors)
        .with_state(state)
}
