//! SPARQL templates for every dashboard read.
//!
//! Identifiers are never spliced in as raw text: they are first parsed into an
//! [`Iri`], which rejects anything that could close the `<...>` IRI reference
//! and smuggle in query text. Timestamps only enter as typed `xsd:dateTime`
//! literals rendered from parsed values.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{LdmError, Result};

/// Maximum number of classes the class list returns.
pub const CLASS_LIST_LIMIT: usize = 20;

const PREFIX_LDM: &str = "PREFIX ldm: <http://example.org/ldm/>";
const PREFIX_RDF: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>";
const PREFIX_PROV: &str = "PREFIX prov: <http://www.w3.org/ns/prov#>";
const PREFIX_TEMP: &str = "PREFIX temp: <http://example.org/temporal/>";
const PREFIX_XSD: &str = "PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>";

lazy_static! {
    // scheme ":" followed by characters allowed in a SPARQL IRIREF
    static ref IRI: Regex =
        Regex::new(r#"^[A-Za-z][A-Za-z0-9+.\-]*:[^<>"{}|^`\\\x00-\x20]+$"#).unwrap();
}

// ------------- Iri -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Iri(String);

impl Iri {
    pub fn parse(candidate: &str) -> Result<Self> {
        let candidate = candidate.trim();
        if IRI.is_match(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(LdmError::InvalidIdentifier(candidate.to_string()))
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

fn date_time_literal(at: &DateTime<Utc>) -> String {
    format!("\"{}\"^^xsd:dateTime", at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

// ------------- SparqlQuery -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlQuery {
    query: String,
}

impl SparqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into() }
    }
    pub fn as_str(&self) -> &str {
        &self.query
    }

    /// Classes ordered by model path then identifier, at most `CLASS_LIST_LIMIT`.
    pub fn list_classes() -> Self {
        Self::new(format!(
            r#"
            {PREFIX_LDM}

            SELECT ?class ?nameContent ?oneLinerContent ?modelPath ?plural WHERE {{
                ?class a ldm:Class .
                OPTIONAL {{ ?class ldm:name ?nameObj . ?nameObj ldm:content ?nameContent }}
                OPTIONAL {{ ?class ldm:one_liner ?oneLinerObj . ?oneLinerObj ldm:content ?oneLinerContent }}
                OPTIONAL {{ ?class ldm:model_path ?modelPath }}
                OPTIONAL {{ ?class ldm:plural ?plural }}
            }}
            ORDER BY ?modelPath ?class
            LIMIT {CLASS_LIST_LIMIT}
            "#
        ))
    }

    pub fn class_by_iri(class: &Iri) -> Self {
        Self::new(format!(
            r#"
            {PREFIX_LDM}

            SELECT ?class ?nameContent ?oneLinerContent ?modelPath ?plural WHERE {{
                ?class a ldm:Class .
                FILTER(?class = {class})
                OPTIONAL {{ ?class ldm:name ?nameObj . ?nameObj ldm:content ?nameContent }}
                OPTIONAL {{ ?class ldm:one_liner ?oneLinerObj . ?oneLinerObj ldm:content ?oneLinerContent }}
                OPTIONAL {{ ?class ldm:model_path ?modelPath }}
                OPTIONAL {{ ?class ldm:plural ?plural }}
            }}
            "#
        ))
    }

    pub fn class_attributes(class: &Iri) -> Self {
        Self::new(format!(
            r#"
            {PREFIX_LDM}

            SELECT ?attr ?nameContent ?oneLinerContent ?dataType ?isOptional ?cardinality WHERE {{
                {class} ldm:attributes ?attr .
                OPTIONAL {{ ?attr ldm:name ?nameObj . ?nameObj ldm:content ?nameContent }}
                OPTIONAL {{ ?attr ldm:one_liner ?oneLinerObj . ?oneLinerObj ldm:content ?oneLinerContent }}
                OPTIONAL {{
                    ?attr ldm:data_type_clause ?dtc .
                    OPTIONAL {{ ?dtc ldm:data_type ?dataType }}
                    OPTIONAL {{ ?dtc ldm:is_optional ?isOptional }}
                    OPTIONAL {{ ?dtc ldm:cardinality ?cardinality }}
                }}
            }}
            "#
        ))
    }

    /// Every parent -> child subject edge in one traversal.
    pub fn subject_edges() -> Self {
        Self::new(format!(
            r#"
            {PREFIX_LDM}

            SELECT ?parent ?parentName ?child ?childName ?childOneLiner WHERE {{
                ?parent ldm:subjects ?child .
                OPTIONAL {{ ?parent ldm:name ?parentNameObj . ?parentNameObj ldm:content ?parentName }}
                OPTIONAL {{ ?child ldm:name ?childNameObj . ?childNameObj ldm:content ?childName }}
                OPTIONAL {{ ?child ldm:one_liner ?childOneLineObj . ?childOneLineObj ldm:content ?childOneLiner }}
            }}
            ORDER BY ?parentName ?childName
            "#
        ))
    }

    /// Subject summary crossed with its classes and sub-subjects.
    pub fn subject_detail(subject: &Iri) -> Self {
        Self::new(format!(
            r#"
            {PREFIX_LDM}

            SELECT ?subject ?name ?oneLiner ?elaboration ?class ?className ?classOneLiner ?subSubject ?subSubjectName ?subSubjectOneLiner WHERE {{
                VALUES ?subject {{ {subject} }}

                OPTIONAL {{ ?subject ldm:name ?nameObj . ?nameObj ldm:content ?name }}
                OPTIONAL {{ ?subject ldm:one_liner ?oneLineObj . ?oneLineObj ldm:content ?oneLiner }}
                OPTIONAL {{ ?subject ldm:elaboration ?elaborationObj . ?elaborationObj ldm:content ?elaboration }}

                OPTIONAL {{
                    ?class ldm:subject ?subject .
                    OPTIONAL {{ ?class ldm:name ?classNameObj . ?classNameObj ldm:content ?className }}
                    OPTIONAL {{ ?class ldm:one_liner ?classOneLineObj . ?classOneLineObj ldm:content ?classOneLiner }}
                }}

                OPTIONAL {{
                    ?subject ldm:subjects ?subSubject .
                    OPTIONAL {{ ?subSubject ldm:name ?subSubjectNameObj . ?subSubjectNameObj ldm:content ?subSubjectName }}
                    OPTIONAL {{ ?subSubject ldm:one_liner ?subSubjectOneLineObj . ?subSubjectOneLineObj ldm:content ?subSubjectOneLiner }}
                }}
            }}
            "#
        ))
    }

    /// Newest change statements first, optionally only those about `subject`.
    pub fn temporal_history(subject: Option<&Iri>, limit: usize) -> Self {
        let filter = subject
            .map(|s| format!("FILTER(?subject = {s})"))
            .unwrap_or_default();
        Self::new(format!(
            r#"
            {PREFIX_RDF}
            {PREFIX_PROV}
            {PREFIX_TEMP}

            SELECT ?statement ?subject ?predicate ?object ?timestamp ?user ?operation ?invalidated WHERE {{
                ?statement a rdf:Statement ;
                           rdf:subject ?subject ;
                           rdf:predicate ?predicate ;
                           rdf:object ?object ;
                           prov:generatedAtTime ?timestamp .
                OPTIONAL {{ ?statement prov:wasAttributedTo ?user }}
                OPTIONAL {{ ?statement temp:operation ?operation }}
                OPTIONAL {{ ?statement prov:invalidatedAtTime ?invalidated }}
                {filter}
            }}
            ORDER BY DESC(?timestamp)
            LIMIT {limit}
            "#
        ))
    }

    /// Every change statement generated at or before `at`, oldest first.
    pub fn statements_until(at: &DateTime<Utc>) -> Self {
        let at = date_time_literal(at);
        Self::new(format!(
            r#"
            {PREFIX_RDF}
            {PREFIX_PROV}
            {PREFIX_TEMP}
            {PREFIX_XSD}

            SELECT ?statement ?subject ?predicate ?object ?timestamp ?user ?operation ?invalidated WHERE {{
                ?statement a rdf:Statement ;
                           rdf:subject ?subject ;
                           rdf:predicate ?predicate ;
                           rdf:object ?object ;
                           prov:generatedAtTime ?timestamp .
                OPTIONAL {{ ?statement prov:wasAttributedTo ?user }}
                OPTIONAL {{ ?statement temp:operation ?operation }}
                OPTIONAL {{ ?statement prov:invalidatedAtTime ?invalidated }}
                FILTER(?timestamp <= {at})
            }}
            ORDER BY ?timestamp
            "#
        ))
    }

    pub fn stats() -> Self {
        Self::new(format!(
            r#"
            {PREFIX_LDM}
            {PREFIX_RDF}
            {PREFIX_PROV}

            SELECT ?totalTriples ?totalClasses ?totalProperties ?temporalStatements WHERE {{
                {{ SELECT (COUNT(*) AS ?totalTriples) WHERE {{ ?s ?p ?o }} }}
                {{ SELECT (COUNT(DISTINCT ?c) AS ?totalClasses) WHERE {{ ?c a ldm:Class }} }}
                {{ SELECT (COUNT(DISTINCT ?pp) AS ?totalProperties) WHERE {{ ?ps ?pp ?po }} }}
                {{ SELECT (COUNT(?st) AS ?temporalStatements) WHERE {{ ?st a rdf:Statement ; prov:generatedAtTime ?t }} }}
            }}
            "#
        ))
    }
}
impl fmt::Display for SparqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.query)
    }
}
