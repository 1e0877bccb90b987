//! Core trait abstractions for the question-answering pipeline.
//!
//! These traits are the seams between the orchestrator and the services it
//! talks to: parser, dictionary, SPARQL endpoint and reference resolution,
//! plus the lazy pattern and query generators.

pub mod backends;
pub mod endpoint;
pub mod generators;
pub mod parser;
pub mod references;
pub mod terms;
