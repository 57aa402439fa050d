//! Runtime settings.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional `ldmview.toml` / `ldmview.json` next to the binary, then
//! `LDMVIEW_*` environment variables (e.g. `LDMVIEW_UPSTREAM_BASE_URL`).

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::hierarchy::RootMarker;

pub const DEFAULT_UPSTREAM: &str = "http://localhost:7200";
pub const DEFAULT_REPOSITORY: &str = "ldm_repos";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemporalSourceKind {
    /// Reified change statements read from the triple store.
    Store,
    /// Fixed in-memory sample records.
    Sample,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub upstream_base_url: String,
    pub default_repository: String,
    pub bind_address: String,
    #[serde(default)]
    pub upstream_timeout_ms: Option<u64>,
    pub temporal_source: TemporalSourceKind,
    pub root_name_marker: String,
    pub root_uri_marker: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upstream_base_url: DEFAULT_UPSTREAM.to_string(),
            default_repository: DEFAULT_REPOSITORY.to_string(),
            bind_address: DEFAULT_BIND.to_string(),
            upstream_timeout_ms: None,
            temporal_source: TemporalSourceKind::Store,
            root_name_marker: "Literate".to_string(),
            root_uri_marker: "LiterateModel".to_string(),
        }
    }
}

impl Settings {
    /// Loads `ldmview.*` from the working directory plus the environment.
    pub fn load() -> Result<Self> {
        Self::load_from("ldmview")
    }
    /// Loads settings using `name` as the base name of the optional file.
    pub fn load_from(name: &str) -> Result<Self> {
        let defaults = Settings::default();
        let settings = Config::builder()
            .set_default("upstream_base_url", defaults.upstream_base_url)?
            .set_default("default_repository", defaults.default_repository)?
            .set_default("bind_address", defaults.bind_address)?
            .set_default("temporal_source", "store")?
            .set_default("root_name_marker", defaults.root_name_marker)?
            .set_default("root_uri_marker", defaults.root_uri_marker)?
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("LDMVIEW").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings.normalized())
    }
    // trailing slashes would otherwise produce "//repositories"
    fn normalized(mut self) -> Self {
        while self.upstream_base_url.ends_with('/') {
            self.upstream_base_url.pop();
        }
        self
    }
    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_ms.map(Duration::from_millis)
    }
    pub fn root_marker(&self) -> RootMarker {
        RootMarker::new(&self.root_name_marker, &self.root_uri_marker)
    }
}
