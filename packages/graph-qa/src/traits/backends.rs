//! Factory for the collaborators of one orchestration run.

use std::sync::Arc;
use std::time::Duration;

use super::{
    endpoint::EndpointAccessor,
    generators::{PatternAnchorGenerator, QueryGenerator},
    parser::ParserService,
    references::ReferenceResolver,
    terms::TermMapper,
};

/// Binds collaborators to the URLs of a dataset and a configuration.
///
/// [`HttpBackends`](crate::backends::HttpBackends) talks to real services;
/// [`MockBackends`](crate::testing::MockBackends) serves canned data.
pub trait Backends: Send + Sync {
    fn parser(&self, parser_url: &str) -> Arc<dyn ParserService>;

    fn term_mapper(&self, dictionary_url: &str) -> Arc<dyn TermMapper>;

    /// An accessor that runs at most `parallel` queries at once.
    fn endpoint(
        &self,
        endpoint_url: &str,
        parallel: usize,
        read_timeout: Duration,
    ) -> Arc<dyn EndpointAccessor>;

    fn references(&self, references_url: &str) -> Arc<dyn ReferenceResolver>;

    fn anchors(&self) -> Arc<dyn PatternAnchorGenerator>;

    fn query_generator(&self) -> Arc<dyn QueryGenerator>;
}
