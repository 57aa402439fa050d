#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ldmview::client::GraphDbClient;
use ldmview::sparql::{Binding, RdfTerm, SparqlResults};
use ldmview::upstream::SparqlExecutor;
use ldmview::{LdmError, Result};

/// Replays queued answers in order and records every query it was asked.
/// Once the queue is drained it answers with an empty result set.
#[derive(Default)]
pub struct CannedExecutor {
    answers: Mutex<VecDeque<Result<SparqlResults>>>,
    queries: Mutex<Vec<String>>,
}

impl CannedExecutor {
    pub fn new(answers: Vec<SparqlResults>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().map(Ok).collect()),
            queries: Mutex::new(Vec::new()),
        })
    }
    /// Like `new` but any answer may be an error.
    pub fn answering(answers: Vec<Result<SparqlResults>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            queries: Mutex::new(Vec::new()),
        })
    }
    pub fn failing(error: LdmError) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(VecDeque::from([Err(error)])),
            queries: Mutex::new(Vec::new()),
        })
    }
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SparqlExecutor for CannedExecutor {
    async fn execute(&self, query: &str) -> Result<SparqlResults> {
        self.queries.lock().unwrap().push(query.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SparqlResults::default()))
    }
}

pub fn client(executor: &Arc<CannedExecutor>) -> GraphDbClient {
    GraphDbClient::new(executor.clone())
}

/// A row from `(var, value)` pairs; values starting with `http` become IRIs.
pub fn row(pairs: &[(&str, &str)]) -> Binding {
    pairs.iter().fold(Binding::new(), |row, (var, value)| {
        let term = if value.starts_with("http") {
            RdfTerm::uri(*value)
        } else {
            RdfTerm::literal(*value)
        };
        row.with(var, term)
    })
}

pub fn results(vars: &[&str], rows: Vec<Binding>) -> SparqlResults {
    SparqlResults::new(vars, rows)
}
