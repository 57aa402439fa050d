//! Change history and "as of" state.
//!
//! A change event is one reified statement about a `(subject, predicate,
//! object)` triple, stamped with the time it was generated, the user it is
//! attributed to, the kind of operation and optionally the time it was
//! invalidated. The state as of an instant `T` keeps, per `(subject,
//! predicate)`, the most recent event generated at or before `T` among those
//! not invalidated at or before `T`, unless that event is a delete.
//!
//! Two sources are provided:
//! * [`SampleHistory`] – three fixed records, useful for demos and tests.
//! * [`StoreHistory`] – reads the change statements from the triple store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::error::{LdmError, Result};
use crate::hierarchy::IriHasher;
use crate::mapper::changes_from_results;
use crate::model::{Operation, TemporalTriple, Triple};
use crate::query::{Iri, SparqlQuery};
use crate::upstream::SparqlExecutor;

/// Default number of history records returned.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses RFC 3339, naive date-times (taken as UTC) and plain dates (midnight UTC).
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| LdmError::InvalidTimestamp(text.to_string()))
}

// ------------- ChangeEvent -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub change: TemporalTriple,
    pub invalidated: Option<DateTime<Utc>>,
}

impl ChangeEvent {
    pub fn new(change: TemporalTriple) -> Self {
        Self { change, invalidated: None }
    }
    pub fn invalidated_at(mut self, at: DateTime<Utc>) -> Self {
        self.invalidated = Some(at);
        self
    }
    // in effect at `at`: generated no later and not yet invalidated
    fn effective_at(&self, at: &DateTime<Utc>) -> bool {
        self.change.timestamp <= *at && self.invalidated.is_none_or(|end| end > *at)
    }
}

/// Triples valid at `at`, sorted by subject then predicate.
///
/// Invalidated events drop out before the latest one is chosen, so an older
/// event still in effect shows through. A delete chosen as latest removes the
/// pair. Among events for the same `(subject, predicate)` with equal
/// timestamps the one appearing later in `events` wins.
pub fn resolve_as_of(events: &[ChangeEvent], at: DateTime<Utc>) -> Vec<Triple> {
    let mut latest = HashMap::<(&str, &str), &ChangeEvent, IriHasher>::default();
    for event in events.iter().filter(|e| e.effective_at(&at)) {
        let key = (event.change.subject.as_str(), event.change.predicate.as_str());
        match latest.entry(key) {
            Entry::Vacant(e) => {
                e.insert(event);
            }
            Entry::Occupied(mut e) => {
                if event.change.timestamp >= e.get().change.timestamp {
                    e.insert(event);
                }
            }
        }
    }
    let mut state: Vec<Triple> = latest
        .into_values()
        .filter(|e| !e.change.operation.is_delete())
        .map(|e| Triple {
            subject: e.change.subject.clone(),
            predicate: e.change.predicate.clone(),
            object: e.change.object.clone(),
        })
        .collect();
    state.sort();
    state
}

// ------------- TemporalSource -------------
#[async_trait]
pub trait TemporalSource: Send + Sync {
    /// Newest changes first, restricted to `subject` when given, at most `limit`.
    async fn history(&self, subject: Option<&str>, limit: usize) -> Result<Vec<TemporalTriple>>;
    /// The set of triples valid at `at`.
    async fn as_of(&self, at: DateTime<Utc>) -> Result<Vec<Triple>>;
}

// ------------- SampleHistory -------------
pub struct SampleHistory {
    events: Vec<ChangeEvent>,
}

impl SampleHistory {
    /// Sample records stamped one, two and three hours before `anchor`.
    pub fn new(anchor: DateTime<Utc>) -> Self {
        let sample = |subject: &str, predicate: &str, object: &str, hours: i64, user: &str, op: &str| {
            ChangeEvent::new(TemporalTriple {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                object: object.to_string(),
                timestamp: anchor - Duration::hours(hours),
                user: user.to_string(),
                operation: Operation::parse(op),
            })
        };
        Self {
            events: vec![
                sample(
                    "http://example.org/LiterateModel",
                    "http://www.w3.org/2000/01/rdf-schema#label",
                    "Literate Data Model",
                    1,
                    "alice@example.org",
                    "CREATE",
                ),
                sample(
                    "http://example.org/Class",
                    "http://www.w3.org/2000/01/rdf-schema#comment",
                    "Updated class definition",
                    2,
                    "bob@example.org",
                    "UPDATE",
                ),
                sample(
                    "http://example.org/Attribute",
                    "http://example.org/hasCardinality",
                    "1..1",
                    3,
                    "alice@example.org",
                    "CREATE",
                ),
            ],
        }
    }
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }
}
impl Default for SampleHistory {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[async_trait]
impl TemporalSource for SampleHistory {
    async fn history(&self, subject: Option<&str>, limit: usize) -> Result<Vec<TemporalTriple>> {
        Ok(self
            .events
            .iter()
            .filter(|e| subject.is_none_or(|s| e.change.subject == s))
            .take(limit)
            .map(|e| e.change.clone())
            .collect())
    }
    async fn as_of(&self, at: DateTime<Utc>) -> Result<Vec<Triple>> {
        Ok(resolve_as_of(&self.events, at))
    }
}

// ------------- StoreHistory -------------
pub struct StoreHistory {
    executor: Arc<dyn SparqlExecutor>,
}

impl StoreHistory {
    pub fn new(executor: Arc<dyn SparqlExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl TemporalSource for StoreHistory {
    async fn history(&self, subject: Option<&str>, limit: usize) -> Result<Vec<TemporalTriple>> {
        let subject = subject.map(Iri::parse).transpose()?;
        let query = SparqlQuery::temporal_history(subject.as_ref(), limit);
        let results = self.executor.execute(query.as_str()).await?;
        debug!(rows = results.len(), "history fetched");
        Ok(changes_from_results(&results)?
            .into_iter()
            .map(|e| e.change)
            .collect())
    }
    async fn as_of(&self, at: DateTime<Utc>) -> Result<Vec<Triple>> {
        let query = SparqlQuery::statements_until(&at);
        let results = self.executor.execute(query.as_str()).await?;
        let events = changes_from_results(&results)?;
        debug!(events = events.len(), %at, "resolving as-of state");
        Ok(resolve_as_of(&events, at))
    }
}
