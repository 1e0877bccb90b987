//! Semantic patterns, term mappings and the query fragments derived from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A node of the semantic pattern: one base noun chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub head: usize,
    pub text: String,
}

/// An edge of the semantic pattern: one relation between two chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub subject: String,
    pub object: String,
    pub text: String,
}

/// The semantic pattern of a question (a "pseudo graph pattern").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pgp {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,

    /// Id of the node the question asks about; empty when there are no nodes
    pub focus: String,
}

impl Pgp {
    /// Texts to look up in the dictionary: node texts, then edge texts.
    pub fn keywords(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|n| n.text.clone())
            .chain(self.edges.iter().map(|e| e.text.clone()))
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Keyword to candidate term URIs, as returned by the dictionary.
pub type Mappings = BTreeMap<String, Vec<String>>;

/// A pattern node bound to one knowledge-base term (or left open).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchoredNode {
    pub id: String,
    pub head: usize,
    pub text: String,
    pub term: Option<String>,
}

/// A semantic pattern with its nodes anchored to terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchoredPattern {
    pub nodes: Vec<AnchoredNode>,
    pub edges: Vec<Edge>,

    /// Focus node id; solutions bind it as the variable `i<focus>`
    pub focus: String,
}

impl AnchoredPattern {
    pub fn node(&self, id: &str) -> Option<&AnchoredNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// One triple pattern of a basic graph pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A basic graph pattern: the query fragment a SPARQL text was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bgp {
    pub triples: Vec<Triple>,
}

impl Bgp {
    pub fn new(triples: Vec<Triple>) -> Self {
        Self { triples }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

/// A dispatched query and its sequence number within the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlQuery {
    pub query: String,
    pub number: usize,
}
