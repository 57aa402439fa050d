use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Query;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use ldmview::client::GraphDbClient;
use ldmview::config::{Settings, TemporalSourceKind};
use ldmview::server::{router, AppState};
use ldmview::LdmError;
use ldmview::upstream::ProxyExecutor;

fn echo(text: &str) -> Value {
    json!({
        "head": { "vars": ["class", "received"] },
        "results": { "bindings": [ {
            "class": { "type": "uri", "value": "http://example.org/ldm/Class/Person" },
            "received": { "type": "literal", "value": text }
        } ] }
    })
}

// a stand-in for the triple store
async fn spawn_store() -> String {
    let store = Router::new()
        .route("/repositories", get(|| async { Json(json!([{ "id": "ldm_repos" }])) }))
        .route(
            "/repositories/ldm_repos",
            post(|body: String| async move { Json(echo(&body)) }).get(
                |Query(params): Query<HashMap<String, String>>| async move {
                    Json(echo(params.get("query").map(String::as_str).unwrap_or_default()))
                },
            ),
        )
        .route(
            "/repositories/down",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE.into_response() }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, store).await.unwrap();
    });
    format!("http://{addr}")
}

// an address nothing listens on
async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn setup(upstream: &str) -> Router {
    let settings = Settings {
        upstream_base_url: upstream.to_string(),
        temporal_source: TemporalSourceKind::Sample,
        ..Settings::default()
    };
    router(Arc::new(AppState::new(settings).expect("state")))
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn post_passes_the_body_through() {
    let app = setup(&spawn_store().await);
    let (status, body) = call(app, form_post("/api/graphdb?repo=ldm_repos", "query=SELECT+*+WHERE+%7B%7D")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["results"]["bindings"][0]["received"]["value"],
        "query=SELECT+*+WHERE+%7B%7D",
        "form body forwarded untouched"
    );
}

#[tokio::test]
async fn post_defaults_to_the_configured_repository() {
    let app = setup(&spawn_store().await);
    let (status, body) = call(app, form_post("/api/graphdb", "query=ASK%7B%7D")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["head"]["vars"][0], "class");
}

#[tokio::test]
async fn store_failure_keeps_its_status() {
    let app = setup(&spawn_store().await);
    let (status, body) = call(app, form_post("/api/graphdb?repo=down", "query=ASK%7B%7D")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "GraphDB error: Service Unavailable" }));
}

#[tokio::test]
async fn unreachable_store_on_post_is_a_500() {
    let app = setup(&dead_address().await);
    let (status, body) = call(app, form_post("/api/graphdb?repo=ldm_repos", "query=ASK%7B%7D")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Query failed: "));
}

#[tokio::test]
async fn unreachable_store_on_get_is_a_500() {
    let app = setup(&dead_address().await);
    let (status, body) = call(app, get_request("/api/graphdb")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Connection failed: "));
}

#[tokio::test]
async fn get_lists_repositories_by_default() {
    let app = setup(&spawn_store().await);
    let (status, body) = call(app, get_request("/api/graphdb")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": "ldm_repos" }]));
}

#[tokio::test]
async fn get_forwards_a_query() {
    let app = setup(&spawn_store().await);
    let (status, body) = call(app, get_request("/api/graphdb?repo=ldm_repos&query=ASK%20%7B%7D")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["bindings"][0]["received"]["value"], "ASK {}");
}

#[tokio::test]
async fn suspicious_names_never_leave_the_proxy() {
    let app = setup(&dead_address().await);
    let (status, _) = call(app.clone(), get_request("/api/graphdb?endpoint=..%2Fadmin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = call(app, form_post("/api/graphdb?repo=a%2Fb", "query=ASK%7B%7D")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid identifier"));
}

#[tokio::test]
async fn client_runs_through_a_live_proxy() {
    let app = setup(&spawn_store().await);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let executor = ProxyExecutor::new(&format!("http://{addr}"), "ldm_repos").expect("executor");
    let client = GraphDbClient::new(Arc::new(executor));
    let classes = client.list_classes().await.expect("classes via proxy");
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].uri, "http://example.org/ldm/Class/Person");

    let down = GraphDbClient::new(Arc::new(ProxyExecutor::new(&format!("http://{addr}"), "down").unwrap()));
    let err = down.list_classes().await.unwrap_err();
    assert_eq!(err.status_code(), 503);
    assert_eq!(err.to_string(), "GraphDB error: Service Unavailable");
}

#[tokio::test]
async fn client_sees_transport_failures_behind_the_proxy() {
    let proxy = serve(setup(&dead_address().await)).await;
    let client = GraphDbClient::new(Arc::new(ProxyExecutor::new(&proxy, "ldm_repos").unwrap()));
    let err = client.list_classes().await.unwrap_err();
    assert!(matches!(err, LdmError::Transport(_)), "got {err:?}");
    assert_eq!(err.status_code(), 500);
    let message = err.to_string();
    assert!(message.starts_with("Connection failed: "));
    assert!(!message.contains("GraphDB error") && !message.contains("Query failed"), "no stacked prefixes: {message}");
}

#[tokio::test]
async fn client_sees_rejected_names_behind_the_proxy() {
    let stub = Router::new().route(
        "/api/graphdb",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid identifier: repository \"ldm_repos\"" })),
            )
        }),
    );
    let proxy = serve(stub).await;
    let client = GraphDbClient::new(Arc::new(ProxyExecutor::new(&proxy, "ldm_repos").unwrap()));
    let err = client.list_classes().await.unwrap_err();
    assert!(matches!(err, LdmError::InvalidIdentifier(_)), "got {err:?}");
    assert_eq!(err.status_code(), 400);
}
