//! Transport to the triple store.
//!
//! [`Upstream`] wraps a `reqwest` client bound to the store's base address and
//! knows the two shapes of call the proxy forwards: a GET against a named REST
//! endpoint and a form POST against a repository's query endpoint.
//!
//! [`SparqlExecutor`] is the seam the client and temporal sources talk to.
//! [`DirectExecutor`] goes straight to the store through an `Upstream`;
//! [`ProxyExecutor`] goes through a running `/api/graphdb` proxy.

use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::Settings;
use crate::error::{LdmError, Result};
use crate::sparql::SparqlResults;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

lazy_static! {
    static ref REPOSITORY: Regex = Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap();
    static ref ENDPOINT: Regex = Regex::new(r"^[A-Za-z0-9_\-]+(/[A-Za-z0-9_\-]+)*$").unwrap();
}

pub fn check_repository(name: &str) -> Result<&str> {
    if REPOSITORY.is_match(name) {
        Ok(name)
    } else {
        Err(LdmError::InvalidIdentifier(format!("repository {name:?}")))
    }
}

pub fn check_endpoint(name: &str) -> Result<&str> {
    if ENDPOINT.is_match(name) {
        Ok(name)
    } else {
        Err(LdmError::InvalidIdentifier(format!("endpoint {name:?}")))
    }
}

// canonical text for the code; reqwest does not expose the phrase the store sent
fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

/// A successful upstream answer: its status and decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Value,
}

// ------------- Upstream -------------
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    base_url: String,
}

impl Upstream {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.upstream_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LdmError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.upstream_base_url.trim_end_matches('/').to_string(),
        })
    }
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
    pub fn repository_url(&self, repository: &str) -> Result<String> {
        Ok(format!("{}/repositories/{}", self.base_url, check_repository(repository)?))
    }

    /// GET `<base>/<endpoint>`.
    pub async fn get(&self, endpoint: &str) -> Result<UpstreamReply> {
        let url = format!("{}/{}", self.base_url, check_endpoint(endpoint)?);
        debug!(%url, "forwarding GET");
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Self::finish(response).await
    }

    /// GET a SPARQL query against `repository` using the protocol's query string form.
    pub async fn get_query(&self, repository: &str, query: &str) -> Result<UpstreamReply> {
        let url = self.repository_url(repository)?;
        debug!(%url, "forwarding GET query");
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .query(&[("query", query)])
            .send()
            .await?;
        Self::finish(response).await
    }

    /// POST an already form-encoded body to `repository`.
    pub async fn post_raw(&self, repository: &str, body: String) -> Result<UpstreamReply> {
        let url = self.repository_url(repository)?;
        debug!(%url, bytes = body.len(), "forwarding POST");
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .body(body)
            .send()
            .await?;
        Self::finish(response).await
    }

    /// POST `query` to `repository` as a `query=` form field.
    pub async fn post_query(&self, repository: &str, query: &str) -> Result<UpstreamReply> {
        let url = self.repository_url(repository)?;
        trace!(%url, query, "posting query");
        let response = self
            .client
            .post(&url)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await?;
        Self::finish(response).await
    }

    async fn finish(response: Response) -> Result<UpstreamReply> {
        let status = response.status();
        debug!(status = status.as_u16(), "upstream responded");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %text, "upstream error body");
            return Err(LdmError::Upstream { status: status.as_u16(), reason: reason(status) });
        }
        let body = response.json::<Value>().await?;
        Ok(UpstreamReply { status: status.as_u16(), body })
    }
}

// ------------- Executors -------------
#[async_trait]
pub trait SparqlExecutor: Send + Sync {
    async fn execute(&self, query: &str) -> Result<SparqlResults>;
}

/// Runs queries straight against the store.
pub struct DirectExecutor {
    upstream: Arc<Upstream>,
    repository: String,
}

impl DirectExecutor {
    pub fn new(upstream: Arc<Upstream>, repository: &str) -> Self {
        Self { upstream, repository: repository.to_string() }
    }
}

#[async_trait]
impl SparqlExecutor for DirectExecutor {
    async fn execute(&self, query: &str) -> Result<SparqlResults> {
        let reply = self.upstream.post_query(&self.repository, query).await?;
        Ok(serde_json::from_value(reply.body)?)
    }
}

/// Runs queries through a running `/api/graphdb` proxy.
pub struct ProxyExecutor {
    client: Client,
    endpoint: String,
}

impl ProxyExecutor {
    /// `proxy_base` is the proxy server's address, e.g. `http://127.0.0.1:3000`.
    pub fn new(proxy_base: &str, repository: &str) -> Result<Self> {
        let repository = check_repository(repository)?;
        Ok(Self {
            client: Client::new(),
            endpoint: format!(
                "{}/api/graphdb?repo={}",
                proxy_base.trim_end_matches('/'),
                repository
            ),
        })
    }
}

fn error_text(body: &Value) -> Option<String> {
    body.get("error").and_then(Value::as_str).map(str::to_string)
}

// undoes the proxy's error envelope so callers see the same class of error
// they would get talking to the store directly
fn proxy_error(code: u16, message: String) -> LdmError {
    if let Some(reason) = message.strip_prefix("GraphDB error: ") {
        return LdmError::Upstream { status: code, reason: reason.to_string() };
    }
    for prefix in ["Query failed: ", "Connection failed: "] {
        if let Some(cause) = message.strip_prefix(prefix) {
            return LdmError::Transport(cause.to_string());
        }
    }
    if code == 400 {
        let detail = message.strip_prefix("Invalid identifier: ").unwrap_or(&message);
        return LdmError::InvalidIdentifier(detail.to_string());
    }
    LdmError::Upstream { status: code, reason: message }
}

#[async_trait]
impl SparqlExecutor for ProxyExecutor {
    async fn execute(&self, query: &str) -> Result<SparqlResults> {
        trace!(endpoint = %self.endpoint, query, "executing query via proxy");
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("query", query)])
            .send()
            .await?;
        let status = response.status();
        debug!(status = status.as_u16(), "proxy responded");
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(match error_text(&body) {
                Some(message) => proxy_error(status.as_u16(), message),
                None => LdmError::Upstream { status: status.as_u16(), reason: reason(status) },
            });
        }
        if let Some(error) = error_text(&body) {
            return Err(LdmError::Upstream { status: status.as_u16(), reason: error });
        }
        Ok(serde_json::from_value(body)?)
    }
}
