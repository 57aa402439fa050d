//! Ldmview – the data-access layer behind the Literate Data Model dashboard.
//!
//! The dashboard browses an ontology kept in a SPARQL triple store. This crate
//! sits between the dashboard and the store:
//! * A stateless HTTP proxy forwards SPARQL queries to the store and relays its
//!   JSON answers, translating failures into a uniform `{"error": ...}` body.
//! * A client builds the fixed set of queries the dashboard needs and maps the
//!   SPARQL JSON result rows into domain records (classes, attributes, subjects).
//! * A hierarchy assembler turns flat parent/child rows into a rooted tree.
//! * A temporal provider answers change-history and "as of" questions over
//!   reified, timestamped statements.
//!
//! ## Modules
//! * [`sparql`] – The SPARQL 1.1 JSON results format (terms, bindings, result sets).
//! * [`query`] – Validated IRIs and the query builders.
//! * [`mapper`] – Result rows to domain records.
//! * [`model`] – The domain records serialized to the dashboard.
//! * [`hierarchy`] – Two-pass subject tree assembly and root selection.
//! * [`temporal`] – Change events, as-of resolution and the history sources.
//! * [`upstream`] – HTTP transport to the store and the [`upstream::SparqlExecutor`] seam.
//! * [`client`] – [`client::GraphDbClient`], the operations the dashboard calls.
//! * [`proxy`] – The `/api/graphdb` pass-through handlers.
//! * [`server`] – Shared state and the `axum` router for all HTTP routes.
//! * [`config`] – Layered settings (defaults, `ldmview.*` file, `LDMVIEW_*` env).
//! * [`error`] – [`LdmError`] and its HTTP status mapping.
//!
//! ## Identifiers
//! Every IRI that ends up inside a query goes through [`query::Iri::parse`]
//! first; repository and endpoint names forwarded by the proxy are checked
//! against a conservative character set. Nothing user supplied is spliced into
//! a query or URL unchecked.
//!
//! ## Time
//! The as-of state at an instant `T` keeps, per `(subject, predicate)`, the
//! latest change generated at or before `T` and not invalidated by `T`, unless
//! that change is a delete. See [`temporal::resolve_as_of`].
//!
//! ## Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use ldmview::{config::Settings, server::{router, AppState}};
//! # async fn run() -> ldmview::Result<()> {
//! let settings = Settings::load()?;
//! let listener = tokio::net::TcpListener::bind(&settings.bind_address).await
//!     .map_err(|e| ldmview::LdmError::Config(e.to_string()))?;
//! let state = Arc::new(AppState::new(settings)?);
//! axum::serve(listener, router(state)).await
//!     .map_err(|e| ldmview::LdmError::Transport(e.to_string()))?;
//! # Ok(())
//! # }
//! ```
//!
//! Queries can also be run directly:
//! ```no_run
//! use std::sync::Arc;
//! use ldmview::{client::GraphDbClient, config::Settings, upstream::{DirectExecutor, Upstream}};
//! # async fn run() -> ldmview::Result<()> {
//! let upstream = Arc::new(Upstream::new(&Settings::default())?);
//! let client = GraphDbClient::new(Arc::new(DirectExecutor::new(upstream, "ldm_repos")));
//! for class in client.list_classes().await? {
//!     println!("{} {:?}", class.uri, class.label);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod mapper;
pub mod model;
pub mod proxy;
pub mod query;
pub mod server;
pub mod sparql;
pub mod temporal;
pub mod upstream;

pub use error::{LdmError, Result};
