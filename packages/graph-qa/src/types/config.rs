//! Configuration for orchestration runs and query generation.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use super::dataset::Dataset;

pub const DEFAULT_PARSER_URL: &str = "http://enju-gtrec.dbcls.jp";
pub const DEFAULT_REFERENCES_URL: &str = "http://urilinks.lodqa.org";
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

/// Configuration for one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Parser service used unless the dataset overrides it.
    pub parser_url: String,

    /// Base URL of the reference-resolution (URL forwarding) service.
    pub references_url: String,

    /// Read timeout for endpoint queries.
    pub read_timeout: Duration,

    /// Maximum number of queries generated per anchored pattern.
    ///
    /// Takes precedence over the dataset's own limit when set.
    pub sparql_limit: Option<usize>,

    /// Maximum number of solutions requested per query.
    ///
    /// Takes precedence over the dataset's own limit when set.
    pub answer_limit: Option<usize>,

    /// Log every emitted event.
    pub debug: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parser_url: DEFAULT_PARSER_URL.to_string(),
            references_url: DEFAULT_REFERENCES_URL.to_string(),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            sparql_limit: None,
            answer_limit: None,
            debug: false,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, reading `.env` if present.
    ///
    /// Unset variables keep their defaults; unparsable numbers are ignored
    /// with a warning.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Ok(url) = env::var("GRAPH_QA_PARSER_URL") {
            config.parser_url = url;
        }
        if let Ok(url) = env::var("GRAPH_QA_REFERENCES_URL") {
            config.references_url = url;
        }
        if let Some(secs) = parse_env::<u64>("GRAPH_QA_READ_TIMEOUT_SECS") {
            config.read_timeout = Duration::from_secs(secs);
        }
        config.sparql_limit = parse_env("GRAPH_QA_SPARQL_LIMIT");
        config.answer_limit = parse_env("GRAPH_QA_ANSWER_LIMIT");
        config.debug = env::var("GRAPH_QA_DEBUG")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        config
    }

    pub fn with_parser_url(mut self, url: impl Into<String>) -> Self {
        self.parser_url = url.into();
        self
    }

    pub fn with_references_url(mut self, url: impl Into<String>) -> Self {
        self.references_url = url.into();
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_sparql_limit(mut self, limit: usize) -> Self {
        self.sparql_limit = Some(limit);
        self
    }

    pub fn with_answer_limit(mut self, limit: usize) -> Self {
        self.answer_limit = Some(limit);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parser URL for a dataset: its own override, else the configured one.
    pub fn parser_url_for<'a>(&'a self, dataset: &'a Dataset) -> &'a str {
        dataset.parser_url.as_deref().unwrap_or(&self.parser_url)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
            None
        }
    }
}

/// Options handed to a query generator for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub max_hop: usize,
    pub ignore_predicates: Vec<String>,
    pub sortal_predicates: Vec<String>,
    pub sparql_limit: Option<usize>,
    pub answer_limit: Option<usize>,
}

impl QueryOptions {
    /// Combine dataset limits with the run configuration.
    pub fn for_dataset(dataset: &Dataset, config: &OrchestratorConfig) -> Self {
        Self {
            max_hop: dataset.max_hop,
            ignore_predicates: dataset.ignore_predicates.clone(),
            sortal_predicates: dataset.sortal_predicates.clone(),
            sparql_limit: config.sparql_limit.or(dataset.sparql_limit),
            answer_limit: config.answer_limit.or(dataset.answer_limit),
        }
    }
}
