//! Lazy generators of anchored patterns and queries.
//!
//! Both generators hand out iterators that the orchestrator pulls one item
//! at a time, so a cancelled run stops generating as soon as it notices.

use crate::types::config::QueryOptions;
use crate::types::pattern::{AnchoredPattern, Bgp, Mappings, Pgp};

/// Iterator of anchored patterns.
pub type AnchoredPatterns<'a> = Box<dyn Iterator<Item = AnchoredPattern> + Send + 'a>;

/// Iterator of (fragment, SPARQL text) pairs.
pub type Queries<'a> = Box<dyn Iterator<Item = (Bgp, String)> + Send + 'a>;

/// Binds a semantic pattern to knowledge-base terms in every possible way.
pub trait PatternAnchorGenerator: Send + Sync {
    /// Start a fresh enumeration. Each call restarts from the beginning.
    fn anchor<'a>(&'a self, pgp: &'a Pgp, mappings: &'a Mappings) -> AnchoredPatterns<'a>;
}

/// Enumerates queries for one anchored pattern, from smaller to larger
/// graph coverage.
pub trait QueryGenerator: Send + Sync {
    fn queries<'a>(
        &'a self,
        anchored: &'a AnchoredPattern,
        options: &'a QueryOptions,
    ) -> Queries<'a>;
}
