// domain records handed to the dashboard, serialized in camelCase
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_CLASS: &str = "Unknown Class";
pub const UNKNOWN_ATTRIBUTE: &str = "Unknown Attribute";
pub const UNKNOWN_SUBJECT: &str = "Unknown Subject";

// ------------- Classes -------------
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub attribute_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInfo {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClassDetail {
    pub class: ClassInfo,
    pub attributes: Vec<AttributeInfo>,
    /// Not counted yet; always 0.
    pub instances: usize,
}

// ------------- Subjects -------------
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectNode {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_liner: Option<String>,
    pub children: Vec<SubjectNode>,
}

impl SubjectNode {
    /// Number of nodes in this subtree, the node itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(SubjectNode::size).sum::<usize>()
    }
    pub fn find(&self, uri: &str) -> Option<&SubjectNode> {
        if self.uri == uri {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(uri))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_liner: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDetail {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_liner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elaboration: Option<String>,
    pub classes: Vec<SubjectSummary>,
    pub sub_subjects: Vec<SubjectSummary>,
}

// ------------- Temporal -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    /// Any other word found in the store, kept verbatim.
    Other(String),
}

impl Operation {
    pub fn parse(word: &str) -> Self {
        match word.trim().to_ascii_lowercase().as_str() {
            "insert" | "create" => Operation::Insert,
            "update" => Operation::Update,
            "delete" => Operation::Delete,
            _ => Operation::Other(word.trim().to_string()),
        }
    }
    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete)
    }
}
impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Insert => write!(f, "insert"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Other(word) => write!(f, "{}", word),
        }
    }
}
impl Serialize for Operation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let word = String::deserialize(deserializer)?;
        Ok(Operation::parse(&word))
    }
}

/// One versioned change event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TemporalTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub operation: Operation,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

// ------------- Dashboard -------------
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_triples: u64,
    pub total_classes: u64,
    pub total_properties: u64,
    pub temporal_statements: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    pub stats: Stats,
    pub classes: Vec<ClassInfo>,
}
