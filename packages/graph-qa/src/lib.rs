//! Natural-language Question Answering over SPARQL Endpoints
//!
//! Turns a question into a semantic pattern with the help of an external
//! dependency parser, anchors the pattern to knowledge-base terms through a
//! dictionary, and then issues increasingly complete SPARQL queries against
//! an endpoint until answers turn up. Everything that happens is reported
//! as a stream of typed events.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use graph_qa::{Dataset, EventKind, HttpBackends, OrchestratorConfig, QueryOrchestrator};
//!
//! let dataset = Dataset::new(
//!     "biomed",
//!     "http://sparql.example.org/sparql",
//!     "http://dictionary.example.org/find_ids.json",
//! );
//! let orchestrator = QueryOrchestrator::new(
//!     dataset,
//!     "Which drugs treat headache?",
//!     uuid::Uuid::new_v4().to_string(),
//!     OrchestratorConfig::from_env(),
//!     Arc::new(HttpBackends::new()?),
//! );
//!
//! orchestrator.on(&[EventKind::Answer], |event| println!("{event:?}"));
//! let outcome = orchestrator.perform().await?;
//! ```
//!
//! # Modules
//!
//! - [`parser`] - Sentence analysis and semantic pattern construction
//! - [`orchestrator`] - Query dispatch, answer enrichment and run lifecycle
//! - [`events`] - Event types and the per-run emitter
//! - [`traits`] - Seams to the parser, dictionary, endpoint and reference services
//! - [`clients`] - HTTP implementations of those seams
//! - [`generators`] - Default anchoring and query generation
//! - [`types`] - Datasets, patterns, answers and configuration
//! - [`testing`] - Mock implementations for testing

pub mod backends;
pub mod clients;
pub mod error;
pub mod events;
pub mod generators;
pub mod orchestrator;
pub mod parser;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use backends::HttpBackends;
pub use error::{EndpointError, LookupError, OrchestratorError, ParserError, ReferenceError};
pub use events::{Event, EventEmitter, EventKind, GatewayFailure, QueryFailure, SubscriptionId};
pub use orchestrator::{QueryOrchestrator, RunOutcome, RunState, PARALLEL};
pub use parser::{DependencyGraph, PatternFactory, SentenceParser};
pub use traits::{
    backends::Backends,
    endpoint::{query_async, EndpointAccessor},
    generators::{PatternAnchorGenerator, QueryGenerator},
    parser::ParserService,
    references::ReferenceResolver,
    terms::TermMapper,
};
pub use types::{
    answer::{Answer, RdfTerm, Rendering, RunStats, Solution, UrlCandidate},
    config::{OrchestratorConfig, QueryOptions},
    dataset::{Dataset, DatasetSummary},
    parse::{BaseNounChunk, ParseResult, Relation, Token},
    pattern::{AnchoredPattern, Bgp, Mappings, Pgp},
};
