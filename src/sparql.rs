//! The SPARQL 1.1 JSON results format as returned by the store.
//!
//! ```json
//! { "head": { "vars": ["class"] },
//!   "results": { "bindings": [ { "class": { "type": "uri", "value": "http://..." } } ] } }
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Uri,
    // older endpoints still emit "typed-literal"
    #[serde(alias = "typed-literal")]
    Literal,
    Bnode,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RdfTerm {
    #[serde(rename = "type")]
    pub kind: TermKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", alias = "lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl RdfTerm {
    pub fn uri(value: impl Into<String>) -> Self {
        Self { kind: TermKind::Uri, value: value.into(), datatype: None, lang: None }
    }
    pub fn literal(value: impl Into<String>) -> Self {
        Self { kind: TermKind::Literal, value: value.into(), datatype: None, lang: None }
    }
}
impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TermKind::Uri => write!(f, "<{}>", self.value),
            TermKind::Bnode => write!(f, "_:{}", self.value),
            TermKind::Literal => match (&self.lang, &self.datatype) {
                (Some(lang), _) => write!(f, "\"{}\"@{}", self.value, lang),
                (None, Some(dt)) => write!(f, "\"{}\"^^<{}>", self.value, dt),
                (None, None) => write!(f, "\"{}\"", self.value),
            },
        }
    }
}

/// One result row. Unbound optional variables are simply missing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Binding(HashMap<String, RdfTerm>);

impl Binding {
    pub fn new() -> Self {
        Self(HashMap::new())
    }
    pub fn with(mut self, var: &str, term: RdfTerm) -> Self {
        self.0.insert(var.to_string(), term);
        self
    }
    pub fn get(&self, var: &str) -> Option<&RdfTerm> {
        self.0.get(var)
    }
    pub fn value(&self, var: &str) -> Option<&str> {
        self.0.get(var).map(|t| t.value.as_str())
    }
    /// Like `value` but treats an empty string as unbound.
    pub fn text(&self, var: &str) -> Option<&str> {
        self.value(var).filter(|v| !v.is_empty())
    }
    /// The first variable in `vars` that has a non-empty value.
    pub fn first_text(&self, vars: &[&str]) -> Option<&str> {
        vars.iter().find_map(|var| self.text(var))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: Head,
    #[serde(default)]
    pub results: Bindings,
}

impl SparqlResults {
    pub fn new(vars: &[&str], bindings: Vec<Binding>) -> Self {
        Self {
            head: Head { vars: vars.iter().map(|v| v.to_string()).collect() },
            results: Bindings { bindings },
        }
    }
    pub fn rows(&self) -> &[Binding] {
        &self.results.bindings
    }
    pub fn len(&self) -> usize {
        self.results.bindings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_payload() {
        let payload = r#"{
            "head": { "vars": ["class", "nameContent"] },
            "results": { "bindings": [
                { "class": { "type": "uri", "value": "http://example.org/ldm/Class/Person" },
                  "nameContent": { "type": "literal", "value": "Person", "xml:lang": "en" } },
                { "class": { "type": "uri", "value": "http://example.org/ldm/Class/Place" } }
            ] }
        }"#;
        let results: SparqlResults = serde_json::from_str(payload).expect("valid results");
        assert_eq!(results.head.vars, vec!["class", "nameContent"]);
        assert_eq!(results.len(), 2);
        let first = &results.rows()[0];
        assert_eq!(first.get("nameContent").and_then(|t| t.lang.as_deref()), Some("en"));
        assert!(results.rows()[1].get("nameContent").is_none());
    }

    #[test]
    fn first_text_skips_empty_values() {
        let row = Binding::new()
            .with("nameContent", RdfTerm::literal(""))
            .with("modelPath", RdfTerm::literal("ldm/Person"));
        assert_eq!(row.first_text(&["nameContent", "modelPath", "plural"]), Some("ldm/Person"));
        assert_eq!(row.first_text(&["plural"]), None);
    }

    #[test]
    fn typed_literal_alias() {
        let term: RdfTerm = serde_json::from_str(
            r#"{"type":"typed-literal","value":"3","datatype":"http://www.w3.org/2001/XMLSchema#integer"}"#,
        )
        .expect("term");
        assert_eq!(term.kind, TermKind::Literal);
        assert_eq!(term.to_string(), "\"3\"^^<http://www.w3.org/2001/XMLSchema#integer>");
    }
}
