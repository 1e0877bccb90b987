//! Typed errors for the question-answering library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the orchestrator can
//! classify failures by variant.

use thiserror::Error;

/// Errors raised while talking to the parser service or interpreting its output.
#[derive(Debug, Error)]
pub enum ParserError {
    /// The parser service could not be reached
    #[error("parser service unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The parser service answered with a non-success status
    #[error("parser service does not respond (HTTP {status})")]
    Status { status: u16 },

    /// The parser service reported an empty input line
    #[error("parser service rejected the input as an empty line")]
    EmptyLine,

    /// The parser service returned HTML instead of tab-separated rows
    #[error("parser service returned html instead of tsv")]
    Html,

    /// A row of the response could not be interpreted
    #[error("malformed parser row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    /// The parse violates an invariant of the analysis
    #[error("inconsistent parse: {0}")]
    Invariant(String),
}

/// Errors raised by the dictionary (term lookup) service.
#[derive(Debug, Error)]
pub enum LookupError {
    /// HTTP request failed
    #[error("dictionary request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success status from the dictionary
    #[error("dictionary at {url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    /// The dictionary response could not be decoded
    #[error("dictionary response could not be decoded: {0}")]
    Decode(String),
}

/// Errors raised by a SPARQL endpoint.
///
/// Every variant carries the endpoint name and the offending query so callers
/// can log which query failed where.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The query did not finish within the read timeout
    #[error("endpoint {endpoint} timed out")]
    Timeout { endpoint: String, sparql: String },

    /// The endpoint is overloaded or briefly unavailable
    #[error("endpoint {endpoint} has a temporary error: {message}")]
    Temporary {
        endpoint: String,
        sparql: String,
        message: String,
    },

    /// The endpoint is unusable for the rest of the run
    #[error("endpoint {endpoint} has a persistent error: {message}")]
    Persistent {
        endpoint: String,
        sparql: String,
        message: String,
    },

    /// Anything the endpoint returned that does not fit the other classes
    #[error("unexpected error from endpoint {endpoint}: {message}")]
    Unexpected {
        endpoint: String,
        sparql: String,
        message: String,
    },
}

impl EndpointError {
    /// Name of the endpoint that failed.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Timeout { endpoint, .. }
            | Self::Temporary { endpoint, .. }
            | Self::Persistent { endpoint, .. }
            | Self::Unexpected { endpoint, .. } => endpoint,
        }
    }

    /// The query that failed.
    pub fn sparql(&self) -> &str {
        match self {
            Self::Timeout { sparql, .. }
            | Self::Temporary { sparql, .. }
            | Self::Persistent { sparql, .. }
            | Self::Unexpected { sparql, .. } => sparql,
        }
    }
}

/// Errors raised by the reference-resolution service that are not plain
/// connectivity failures.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// HTTP request failed after the connection was established
    #[error("reference request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON
    #[error("reference response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors surfaced by the orchestrator API itself.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// `perform` was called on an instance that has already run
    #[error("orchestrator for run {run_id} has already been started")]
    AlreadyStarted { run_id: String },
}

/// Result type alias for parser operations.
pub type ParserResult<T> = std::result::Result<T, ParserError>;

/// Result type alias for dictionary operations.
pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// Result type alias for endpoint operations.
pub type EndpointResult<T> = std::result::Result<T, EndpointError>;
