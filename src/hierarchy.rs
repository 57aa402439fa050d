//! Two-pass assembly of the subject hierarchy from flat parent/child rows.
//!
//! Pass one keeps one node record per IRI (the first row that mentions an IRI
//! decides its name and one-liner). Pass two appends children to parents once
//! per edge row, so a repeated edge yields a repeated child. The root is the
//! first kept node whose name or IRI contains the configured marker.

use core::hash::BuildHasherDefault;
use std::collections::HashMap;

use seahash::SeaHasher;
use tracing::warn;

use crate::error::{LdmError, Result};
use crate::model::{SubjectNode, UNKNOWN};
use crate::sparql::{Binding, SparqlResults};

pub type IriHasher = BuildHasherDefault<SeaHasher>;

// ------------- RootMarker -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMarker {
    name: String,
    uri: String,
}

impl RootMarker {
    pub fn new(name: &str, uri: &str) -> Self {
        Self { name: name.to_string(), uri: uri.to_string() }
    }
    pub fn matches(&self, name: &str, uri: &str) -> bool {
        name.contains(&self.name) || uri.contains(&self.uri)
    }
}
impl Default for RootMarker {
    fn default() -> Self {
        Self::new("Literate", "LiterateModel")
    }
}

// ------------- SubjectEdge -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectEdge {
    pub parent: String,
    pub parent_name: Option<String>,
    pub child: String,
    pub child_name: Option<String>,
    pub child_one_liner: Option<String>,
}

impl SubjectEdge {
    pub fn new(parent: &str, child: &str) -> Self {
        Self {
            parent: parent.to_string(),
            parent_name: None,
            child: child.to_string(),
            child_name: None,
            child_one_liner: None,
        }
    }
    pub fn named(mut self, parent_name: &str, child_name: &str) -> Self {
        self.parent_name = Some(parent_name.to_string());
        self.child_name = Some(child_name.to_string());
        self
    }
    pub fn from_row(row: &Binding) -> Result<Self> {
        let parent = row
            .text("parent")
            .ok_or_else(|| LdmError::Decode("edge row is missing ?parent".into()))?;
        let child = row
            .text("child")
            .ok_or_else(|| LdmError::Decode("edge row is missing ?child".into()))?;
        Ok(Self {
            parent: parent.to_string(),
            parent_name: row.text("parentName").map(str::to_string),
            child: child.to_string(),
            child_name: row.text("childName").map(str::to_string),
            child_one_liner: row.value("childOneLiner").map(str::to_string),
        })
    }
    pub fn from_results(results: &SparqlResults) -> Result<Vec<Self>> {
        results.rows().iter().map(Self::from_row).collect()
    }
}

// ------------- NodeKeeper -------------
#[derive(Debug)]
struct NodeRecord {
    uri: String,
    name: String,
    one_liner: Option<String>,
    children: Vec<usize>,
}

#[derive(Debug, Default)]
struct NodeKeeper {
    kept: Vec<NodeRecord>,
    index: HashMap<String, usize, IriHasher>,
}
impl NodeKeeper {
    // returns the position of the kept node; an existing node is never overwritten
    fn keep(&mut self, uri: &str, name: Option<&str>, one_liner: Option<&str>) -> usize {
        if let Some(&i) = self.index.get(uri) {
            return i;
        }
        let i = self.kept.len();
        self.kept.push(NodeRecord {
            uri: uri.to_string(),
            name: name.unwrap_or(UNKNOWN).to_string(),
            one_liner: one_liner.map(str::to_string),
            children: Vec::new(),
        });
        self.index.insert(uri.to_string(), i);
        i
    }
    fn position(&self, uri: &str) -> Option<usize> {
        self.index.get(uri).copied()
    }
}

// ------------- Hierarchy -------------
#[derive(Debug, Default)]
pub struct Hierarchy {
    nodes: NodeKeeper,
}

impl Hierarchy {
    pub fn assemble(edges: &[SubjectEdge]) -> Self {
        let mut nodes = NodeKeeper::default();
        // first pass: every IRI gets exactly one node
        for edge in edges {
            nodes.keep(&edge.parent, edge.parent_name.as_deref(), None);
            nodes.keep(
                &edge.child,
                edge.child_name.as_deref(),
                edge.child_one_liner.as_deref(),
            );
        }
        // second pass: one child entry per edge row
        for edge in edges {
            if let (Some(p), Some(c)) = (nodes.position(&edge.parent), nodes.position(&edge.child)) {
                nodes.kept[p].children.push(c);
            }
        }
        Self { nodes }
    }
    pub fn len(&self) -> usize {
        self.nodes.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.kept.is_empty()
    }
    /// Child IRIs of `uri` in edge order, repeated edges included.
    pub fn children_of(&self, uri: &str) -> Vec<&str> {
        self.nodes
            .position(uri)
            .map(|p| {
                self.nodes.kept[p]
                    .children
                    .iter()
                    .map(|&c| self.nodes.kept[c].uri.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
    /// IRI of the first kept node matching `marker`.
    pub fn root_uri(&self, marker: &RootMarker) -> Option<&str> {
        self.nodes
            .kept
            .iter()
            .find(|n| marker.matches(&n.name, &n.uri))
            .map(|n| n.uri.as_str())
    }
    /// Owned tree below `uri`. A node already on the current path is emitted
    /// without children so cyclic edge data still terminates.
    ///
    /// Recursion depth equals the depth of the subject hierarchy, and a
    /// subject shared by several parents is copied under each of them, so
    /// the output is sized for shallow, mostly tree-shaped models.
    pub fn tree(&self, uri: &str) -> Option<SubjectNode> {
        let start = self.nodes.position(uri)?;
        let mut on_path = vec![false; self.nodes.kept.len()];
        let mut cut = 0usize;
        let tree = self.materialize(start, &mut on_path, &mut cut);
        if cut > 0 {
            warn!(root = uri, back_edges = cut, "subject hierarchy contains cycles");
        }
        Some(tree)
    }
    pub fn rooted_tree(&self, marker: &RootMarker) -> Option<SubjectNode> {
        self.root_uri(marker).and_then(|uri| self.tree(uri))
    }
    fn materialize(&self, i: usize, on_path: &mut Vec<bool>, cut: &mut usize) -> SubjectNode {
        let record = &self.nodes.kept[i];
        on_path[i] = true;
        let mut children = Vec::with_capacity(record.children.len());
        for &c in &record.children {
            if on_path[c] {
                *cut += 1;
                let back = &self.nodes.kept[c];
                children.push(SubjectNode {
                    uri: back.uri.clone(),
                    name: back.name.clone(),
                    one_liner: back.one_liner.clone(),
                    children: Vec::new(),
                });
            } else {
                children.push(self.materialize(c, on_path, cut));
            }
        }
        on_path[i] = false;
        SubjectNode {
            uri: record.uri.clone(),
            name: record.name.clone(),
            one_liner: record.one_liner.clone(),
            children,
        }
    }
}

/// Assembles `edges` and returns the tree under the marked root, if any.
pub fn assemble_hierarchy(edges: &[SubjectEdge], marker: &RootMarker) -> Option<SubjectNode> {
    Hierarchy::assemble(edges).rooted_tree(marker)
}
