//! Query solutions, answers and run statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use super::dataset::DatasetSummary;

/// Kind of an RDF term bound in a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Uri,
    Literal,
    #[serde(alias = "typed-literal")]
    TypedLiteral,
    Bnode,
}

/// A typed RDF term as returned by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdfTerm {
    #[serde(rename = "type")]
    pub kind: TermKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(default, rename = "xml:lang", skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl RdfTerm {
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Uri,
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Literal,
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }
}

impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// One solution as returned by an endpoint: variable name to typed term.
pub type RawSolution = BTreeMap<String, RdfTerm>;

/// One solution reduced to plain strings: variable name to value.
pub type Solution = BTreeMap<String, String>;

/// Convert raw endpoint solutions into plain string mappings.
pub fn to_plain(raw: &[RawSolution]) -> Vec<Solution> {
    raw.iter()
        .map(|s| s.iter().map(|(k, v)| (k.clone(), v.to_string())).collect())
        .collect()
}

/// Where an answer URI can be viewed outside the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forwarding {
    pub url: String,
}

/// A rendering of an answer (e.g. a picture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rendering {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Rendering {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("image"))
    }
}

/// One candidate returned by the reference-resolution service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlCandidate {
    #[serde(default)]
    pub matching_score: f64,
    #[serde(default)]
    pub priority: f64,
    pub forwarding: Forwarding,
    #[serde(default)]
    pub rendering: Option<Rendering>,
}

/// An answer to the question with its enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub uri: String,

    /// `rdfs:label` of the URI, empty when none was found
    pub label: String,

    /// Forwarding candidates, absent when the reference service gave no data
    pub urls: Option<Vec<UrlCandidate>>,

    pub first_rendering: Option<Rendering>,
}

/// Statistics of one orchestration run, logged when the drain completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub parallel: usize,

    /// Wall-clock seconds from the first dispatch to the end of the drain
    pub duration: f64,

    pub dataset: DatasetSummary,

    /// Number of completed queries
    pub sparqls: usize,

    pub error: usize,

    pub success: usize,

    pub error_rate: f64,
}

impl RunStats {
    /// Compute stats; returns `None` when nothing completed.
    pub fn compute(
        parallel: usize,
        duration: Duration,
        dataset: DatasetSummary,
        error: usize,
        success: usize,
    ) -> Option<Self> {
        let sparqls = error + success;
        if sparqls == 0 {
            return None;
        }

        Some(Self {
            parallel,
            duration: duration.as_secs_f64(),
            dataset,
            sparqls,
            error,
            success,
            error_rate: error as f64 / sparqls as f64,
        })
    }
}
