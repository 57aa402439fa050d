//! Turns result rows into domain records.
//!
//! Absent name-bearing variables are replaced with the fallback strings from
//! [`crate::model`], so a label of `"Unknown Class"` means "nothing upstream",
//! not a class actually called that.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{LdmError, Result};
use crate::hierarchy::IriHasher;
use crate::model::{
    AttributeInfo, ClassInfo, Operation, Stats, SubjectDetail, SubjectSummary, TemporalTriple,
    UNKNOWN, UNKNOWN_ATTRIBUTE, UNKNOWN_CLASS, UNKNOWN_SUBJECT,
};
use crate::sparql::{Binding, SparqlResults};
use crate::temporal::{parse_timestamp, ChangeEvent};

/// Candidate variables for a class label, in order of preference.
pub const CLASS_LABEL_VARS: [&str; 3] = ["nameContent", "modelPath", "plural"];

fn required<'a>(row: &'a Binding, var: &str) -> Result<&'a str> {
    row.text(var)
        .ok_or_else(|| LdmError::Decode(format!("row is missing ?{var}")))
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

// ------------- Classes -------------
pub fn class_from_row(row: &Binding) -> Result<ClassInfo> {
    Ok(ClassInfo {
        uri: required(row, "class")?.to_string(),
        label: Some(row.first_text(&CLASS_LABEL_VARS).unwrap_or(UNKNOWN_CLASS).to_string()),
        comment: owned(row.value("oneLinerContent")),
        attribute_count: 0,
        last_modified: None,
    })
}

pub fn classes_from_results(results: &SparqlResults) -> Result<Vec<ClassInfo>> {
    results.rows().iter().map(class_from_row).collect()
}

fn boolean(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

pub fn attribute_from_row(domain: &str, row: &Binding) -> Result<AttributeInfo> {
    Ok(AttributeInfo {
        uri: required(row, "attr")?.to_string(),
        label: Some(row.text("nameContent").unwrap_or(UNKNOWN_ATTRIBUTE).to_string()),
        domain: Some(domain.to_string()),
        range: Some(row.text("dataType").unwrap_or(UNKNOWN).to_string()),
        is_optional: row.text("isOptional").and_then(boolean),
        cardinality: owned(row.text("cardinality")),
        last_modified: None,
    })
}

/// Attributes of `domain`, one per attribute IRI; the first row seen wins.
pub fn attributes_from_results(domain: &str, results: &SparqlResults) -> Result<Vec<AttributeInfo>> {
    let mut seen = HashSet::<String, IriHasher>::default();
    let mut attributes = Vec::new();
    for row in results.rows() {
        let attribute = attribute_from_row(domain, row)?;
        if seen.insert(attribute.uri.clone()) {
            attributes.push(attribute);
        }
    }
    Ok(attributes)
}

// ------------- Subjects -------------
/// Keeps first-seen order while letting later rows refresh the stored value.
struct SummaryKeeper {
    kept: Vec<SubjectSummary>,
    index: HashMap<String, usize, IriHasher>,
}
impl SummaryKeeper {
    fn new() -> Self {
        Self { kept: Vec::new(), index: HashMap::default() }
    }
    fn keep(&mut self, summary: SubjectSummary) {
        match self.index.get(&summary.uri) {
            Some(&i) => self.kept[i] = summary,
            None => {
                self.index.insert(summary.uri.clone(), self.kept.len());
                self.kept.push(summary);
            }
        }
    }
    fn into_vec(self) -> Vec<SubjectSummary> {
        self.kept
    }
}

/// Collapses the subject x class x sub-subject cross product into one detail.
///
/// The caller guarantees `rows` is not empty.
pub fn subject_detail_from_rows(uri: &str, rows: &[Binding]) -> SubjectDetail {
    let mut classes = SummaryKeeper::new();
    let mut sub_subjects = SummaryKeeper::new();
    for row in rows {
        if let Some(class) = row.text("class") {
            classes.keep(SubjectSummary {
                uri: class.to_string(),
                name: row.text("className").unwrap_or(UNKNOWN_CLASS).to_string(),
                one_liner: owned(row.value("classOneLiner")),
            });
        }
        if let Some(sub) = row.text("subSubject") {
            sub_subjects.keep(SubjectSummary {
                uri: sub.to_string(),
                name: row.text("subSubjectName").unwrap_or(UNKNOWN_SUBJECT).to_string(),
                one_liner: owned(row.value("subSubjectOneLiner")),
            });
        }
    }
    let first = rows.first();
    SubjectDetail {
        uri: uri.to_string(),
        name: first
            .and_then(|r| r.text("name"))
            .unwrap_or(UNKNOWN_SUBJECT)
            .to_string(),
        one_liner: owned(first.and_then(|r| r.value("oneLiner"))),
        elaboration: owned(first.and_then(|r| r.value("elaboration"))),
        classes: classes.into_vec(),
        sub_subjects: sub_subjects.into_vec(),
    }
}

// ------------- Temporal -------------
// a bad timestamp coming from the store is a decode problem, not bad input
fn stored_timestamp(text: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(text).map_err(|e| LdmError::Decode(e.to_string()))
}

pub fn change_from_row(row: &Binding) -> Result<ChangeEvent> {
    let timestamp = stored_timestamp(required(row, "timestamp")?)?;
    let invalidated = row.text("invalidated").map(stored_timestamp).transpose()?;
    Ok(ChangeEvent {
        change: TemporalTriple {
            subject: required(row, "subject")?.to_string(),
            predicate: required(row, "predicate")?.to_string(),
            object: row.value("object").unwrap_or_default().to_string(),
            timestamp,
            user: row.text("user").unwrap_or("unknown").to_string(),
            operation: row
                .text("operation")
                .map(Operation::parse)
                .unwrap_or(Operation::Insert),
        },
        invalidated,
    })
}

pub fn changes_from_results(results: &SparqlResults) -> Result<Vec<ChangeEvent>> {
    results.rows().iter().map(change_from_row).collect()
}

// ------------- Stats -------------
fn count(row: &Binding, var: &str) -> Result<u64> {
    match row.text(var) {
        Some(text) => text
            .parse::<u64>()
            .map_err(|e| LdmError::Decode(format!("?{var} is not a count: {e}"))),
        None => Ok(0),
    }
}

pub fn stats_from_results(results: &SparqlResults) -> Result<Stats> {
    let Some(row) = results.rows().first() else {
        return Ok(Stats::default());
    };
    Ok(Stats {
        total_triples: count(row, "totalTriples")?,
        total_classes: count(row, "totalClasses")?,
        total_properties: count(row, "totalProperties")?,
        temporal_statements: count(row, "temporalStatements")?,
    })
}
