//! Sentence parsing and semantic pattern construction.
//!
//! - [`graph`] - Shortest paths over semantic-argument links
//! - [`sentence`] - Tokens, base noun chunks, relations and focus
//! - [`pattern`] - Semantic pattern built from a parse

pub mod graph;
pub mod pattern;
pub mod sentence;

pub use graph::DependencyGraph;
pub use pattern::PatternFactory;
pub use sentence::{analyze, SentenceParser};
