//! Backends that talk to the real services over HTTP.

use std::sync::Arc;
use std::time::Duration;

use crate::clients::{HttpParserService, HttpReferenceResolver, HttpTermMapper, SparqlEndpoint};
use crate::generators::{CartesianAnchors, PathQueryGenerator};
use crate::traits::{
    backends::Backends,
    endpoint::EndpointAccessor,
    generators::{PatternAnchorGenerator, QueryGenerator},
    parser::ParserService,
    references::ReferenceResolver,
    terms::TermMapper,
};

/// HTTP clients sharing one connection pool.
///
/// Each call to [`Backends::endpoint`] creates a fresh accessor, so the
/// response cache lives exactly as long as one run.
pub struct HttpBackends {
    client: reqwest::Client,
    anchors: Arc<dyn PatternAnchorGenerator>,
    query_generator: Arc<dyn QueryGenerator>,
}

impl HttpBackends {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("graph-qa/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            anchors: Arc::new(CartesianAnchors::new()),
            query_generator: Arc::new(PathQueryGenerator::new()),
        }
    }

    pub fn with_anchors(mut self, anchors: Arc<dyn PatternAnchorGenerator>) -> Self {
        self.anchors = anchors;
        self
    }

    pub fn with_query_generator(mut self, query_generator: Arc<dyn QueryGenerator>) -> Self {
        self.query_generator = query_generator;
        self
    }
}

impl Backends for HttpBackends {
    fn parser(&self, parser_url: &str) -> Arc<dyn ParserService> {
        Arc::new(HttpParserService::new(parser_url).with_client(self.client.clone()))
    }

    fn term_mapper(&self, dictionary_url: &str) -> Arc<dyn TermMapper> {
        Arc::new(HttpTermMapper::new(dictionary_url).with_client(self.client.clone()))
    }

    fn endpoint(
        &self,
        endpoint_url: &str,
        parallel: usize,
        read_timeout: Duration,
    ) -> Arc<dyn EndpointAccessor> {
        Arc::new(
            SparqlEndpoint::new(endpoint_url, parallel, read_timeout)
                .with_client(self.client.clone()),
        )
    }

    fn references(&self, references_url: &str) -> Arc<dyn ReferenceResolver> {
        Arc::new(HttpReferenceResolver::new(references_url).with_client(self.client.clone()))
    }

    fn anchors(&self) -> Arc<dyn PatternAnchorGenerator> {
        Arc::clone(&self.anchors)
    }

    fn query_generator(&self) -> Arc<dyn QueryGenerator> {
        Arc::clone(&self.query_generator)
    }
}
