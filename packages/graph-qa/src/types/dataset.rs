//! Dataset descriptors.

use serde::{Deserialize, Serialize};

/// A knowledge base the orchestrator can query.
///
/// Owned by the caller; the orchestrator only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,

    /// Display order among several datasets
    #[serde(default)]
    pub number: Option<u32>,

    pub endpoint_url: String,

    pub dictionary_url: String,

    /// Overrides the configured parser URL for this dataset
    #[serde(default)]
    pub parser_url: Option<String>,

    /// Maximum number of predicates between two anchored nodes
    #[serde(default = "default_max_hop")]
    pub max_hop: usize,

    #[serde(default)]
    pub ignore_predicates: Vec<String>,

    /// Predicates that relate an instance to its class
    #[serde(default)]
    pub sortal_predicates: Vec<String>,

    /// Maximum number of queries generated per anchored pattern
    #[serde(default)]
    pub sparql_limit: Option<usize>,

    /// Maximum number of solutions requested per query
    #[serde(default)]
    pub answer_limit: Option<usize>,
}

fn default_max_hop() -> usize {
    2
}

impl Dataset {
    /// Create a dataset with default search limits.
    pub fn new(
        name: impl Into<String>,
        endpoint_url: impl Into<String>,
        dictionary_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            number: None,
            endpoint_url: endpoint_url.into(),
            dictionary_url: dictionary_url.into(),
            parser_url: None,
            max_hop: default_max_hop(),
            ignore_predicates: Vec::new(),
            sortal_predicates: Vec::new(),
            sparql_limit: None,
            answer_limit: None,
        }
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_parser_url(mut self, url: impl Into<String>) -> Self {
        self.parser_url = Some(url.into());
        self
    }

    pub fn with_max_hop(mut self, max_hop: usize) -> Self {
        self.max_hop = max_hop;
        self
    }

    pub fn with_ignore_predicates(
        mut self,
        predicates: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.ignore_predicates = predicates.into_iter().map(|p| p.into()).collect();
        self
    }

    pub fn with_sortal_predicates(
        mut self,
        predicates: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.sortal_predicates = predicates.into_iter().map(|p| p.into()).collect();
        self
    }

    /// The part of the descriptor that is echoed in every event.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            name: self.name.clone(),
            number: self.number,
        }
    }
}

/// Dataset identity as carried by events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub number: Option<u32>,
}
