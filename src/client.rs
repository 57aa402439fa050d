//! The dashboard's data-access client.
//!
//! Each operation builds one fixed query, runs it through the configured
//! [`SparqlExecutor`] and maps the rows into domain records. Nothing is cached:
//! every call goes back to the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{LdmError, Result};
use crate::hierarchy::{Hierarchy, RootMarker, SubjectEdge};
use crate::mapper::{
    attributes_from_results, class_from_row, classes_from_results, stats_from_results,
    subject_detail_from_rows,
};
use crate::model::{ClassDetail, ClassInfo, Overview, Stats, SubjectDetail, SubjectNode, TemporalTriple, Triple};
use crate::query::{Iri, SparqlQuery, CLASS_LIST_LIMIT};
use crate::sparql::SparqlResults;
use crate::temporal::{parse_timestamp, SampleHistory, TemporalSource};
use crate::upstream::SparqlExecutor;

pub struct GraphDbClient {
    executor: Arc<dyn SparqlExecutor>,
    temporal: Arc<dyn TemporalSource>,
    root_marker: RootMarker,
}

impl GraphDbClient {
    /// A client using the sample history and the default root marker.
    pub fn new(executor: Arc<dyn SparqlExecutor>) -> Self {
        Self {
            executor,
            temporal: Arc::new(SampleHistory::default()),
            root_marker: RootMarker::default(),
        }
    }
    pub fn with_temporal(mut self, temporal: Arc<dyn TemporalSource>) -> Self {
        self.temporal = temporal;
        self
    }
    pub fn with_root_marker(mut self, marker: RootMarker) -> Self {
        self.root_marker = marker;
        self
    }

    pub async fn execute_query(&self, query: &str) -> Result<SparqlResults> {
        debug!(bytes = query.len(), "executing query");
        let results = self.executor.execute(query).await?;
        debug!(rows = results.len(), "query complete");
        Ok(results)
    }
    async fn run(&self, query: SparqlQuery) -> Result<SparqlResults> {
        self.execute_query(query.as_str()).await
    }

    /// At most `CLASS_LIST_LIMIT` classes in store order; attribute counts are
    /// not computed here and are always 0.
    pub async fn list_classes(&self) -> Result<Vec<ClassInfo>> {
        let results = self.run(SparqlQuery::list_classes()).await?;
        let mut classes = classes_from_results(&results)?;
        classes.truncate(CLASS_LIST_LIMIT);
        Ok(classes)
    }

    pub async fn class_details(&self, class_uri: &str) -> Result<ClassDetail> {
        let class = Iri::parse(class_uri)?;
        let results = self.run(SparqlQuery::class_by_iri(&class)).await?;
        let Some(row) = results.rows().first() else {
            return Err(LdmError::class_not_found(class.as_str()));
        };
        let mut info = class_from_row(row)?;

        let results = self.run(SparqlQuery::class_attributes(&class)).await?;
        let attributes = attributes_from_results(class.as_str(), &results)?;
        info.attribute_count = attributes.len();

        Ok(ClassDetail { class: info, attributes, instances: 0 })
    }

    /// The subject tree under the marked root, or `None` when no node matches.
    pub async fn subject_hierarchy(&self) -> Result<Option<SubjectNode>> {
        let results = self.run(SparqlQuery::subject_edges()).await?;
        let edges = SubjectEdge::from_results(&results)?;
        let hierarchy = Hierarchy::assemble(&edges);
        debug!(edges = edges.len(), nodes = hierarchy.len(), "hierarchy assembled");
        Ok(hierarchy.rooted_tree(&self.root_marker))
    }

    pub async fn subject_details(&self, subject_uri: &str) -> Result<SubjectDetail> {
        let subject = Iri::parse(subject_uri)?;
        let results = self.run(SparqlQuery::subject_detail(&subject)).await?;
        if results.is_empty() {
            return Err(LdmError::subject_not_found(subject.as_str()));
        }
        Ok(subject_detail_from_rows(subject.as_str(), results.rows()))
    }

    pub async fn temporal_history(&self, subject: Option<&str>, limit: usize) -> Result<Vec<TemporalTriple>> {
        self.temporal.history(subject, limit).await
    }

    pub async fn as_of_state(&self, at: DateTime<Utc>) -> Result<Vec<Triple>> {
        self.temporal.as_of(at).await
    }

    /// Same as `as_of_state` but takes the timestamp as text.
    pub async fn as_of_text(&self, at: &str) -> Result<Vec<Triple>> {
        self.as_of_state(parse_timestamp(at)?).await
    }

    pub async fn stats(&self) -> Result<Stats> {
        let results = self.run(SparqlQuery::stats()).await?;
        stats_from_results(&results)
    }

    /// Stats and class list, fetched concurrently.
    pub async fn overview(&self) -> Result<Overview> {
        let (stats, classes) = tokio::try_join!(self.stats(), self.list_classes())?;
        Ok(Overview { stats, classes })
    }
}
