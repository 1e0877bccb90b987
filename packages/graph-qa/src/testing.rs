//! Testing utilities including mock implementations.
//!
//! These let applications and tests drive the orchestrator without a parser
//! service, a dictionary, a SPARQL endpoint or the URL forwarding service.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::clients::parser::check_response;
use crate::error::{
    EndpointError, EndpointResult, LookupError, LookupResult, ParserError, ParserResult,
    ReferenceError,
};
use crate::generators::{CartesianAnchors, PathQueryGenerator};
use crate::traits::{
    backends::Backends,
    endpoint::EndpointAccessor,
    generators::{AnchoredPatterns, PatternAnchorGenerator, Queries, QueryGenerator},
    parser::ParserService,
    references::ReferenceResolver,
    terms::TermMapper,
};
use crate::types::answer::{RawSolution, UrlCandidate};
use crate::types::config::QueryOptions;
use crate::types::pattern::{AnchoredPattern, Bgp, Mappings, Pgp};

// ============================================================================
// Parser service
// ============================================================================

#[derive(Debug, Clone)]
struct CannedParse {
    status: u16,
    content_type: Option<String>,
    body: String,
}

/// A parser service with canned CoNLL responses per sentence.
///
/// Responses go through the same checks as the HTTP client, so a canned
/// HTML page or "Empty line" body fails the way a real one would.
/// Sentences without a canned response fail as unreachable.
#[derive(Default)]
pub struct MockParserService {
    responses: Arc<RwLock<HashMap<String, CannedParse>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockParserService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sentence` with a plain-text body.
    pub fn with_response(self, sentence: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_raw_response(sentence, 200, Some("text/plain"), body)
    }

    /// Answer `sentence` with an arbitrary status and content type.
    pub fn with_raw_response(
        self,
        sentence: impl Into<String>,
        status: u16,
        content_type: Option<&str>,
        body: impl Into<String>,
    ) -> Self {
        self.responses.write().unwrap().insert(
            sentence.into(),
            CannedParse {
                status,
                content_type: content_type.map(String::from),
                body: body.into(),
            },
        );
        self
    }

    /// Sentences sent to the service, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl ParserService for MockParserService {
    async fn parse_conll(&self, sentence: &str) -> ParserResult<String> {
        self.calls.write().unwrap().push(sentence.to_string());

        let canned = self.responses.read().unwrap().get(sentence).cloned();
        match canned {
            Some(c) => check_response(c.status, c.content_type.as_deref(), c.body),
            None => Err(ParserError::Unreachable {
                url: "mock://parser".to_string(),
                source: format!("no canned response for {sentence:?}").into(),
            }),
        }
    }
}

// ============================================================================
// Dictionary
// ============================================================================

/// A dictionary with fixed keyword mappings.
#[derive(Default)]
pub struct MockTermMapper {
    mappings: Arc<RwLock<Mappings>>,
    failing: bool,
    calls: Arc<RwLock<Vec<Vec<String>>>>,
}

impl MockTermMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `keyword` to candidate terms.
    pub fn with_mapping(self, keyword: impl Into<String>, terms: &[&str]) -> Self {
        self.mappings
            .write()
            .unwrap()
            .insert(keyword.into(), terms.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Fail every lookup with a 500 status.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    /// Keyword lists looked up, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl TermMapper for MockTermMapper {
    async fn find(&self, keywords: &[String]) -> LookupResult<Mappings> {
        self.calls.write().unwrap().push(keywords.to_vec());

        if self.failing {
            return Err(LookupError::Status {
                url: "mock://dictionary".to_string(),
                status: 500,
            });
        }

        let mappings = self.mappings.read().unwrap();
        Ok(keywords
            .iter()
            .map(|k| (k.clone(), mappings.get(k).cloned().unwrap_or_default()))
            .collect())
    }
}

// ============================================================================
// SPARQL endpoint
// ============================================================================

/// Failure a [`MockEndpoint`] reports for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Timeout,
    Temporary,
    Persistent,
    Unexpected,
}

#[derive(Debug, Clone)]
enum CannedReply {
    Solutions(Vec<RawSolution>),
    Failure(MockFailure),
}

/// An endpoint with canned replies per query text.
///
/// Queries without a canned reply return no solutions.
pub struct MockEndpoint {
    name: String,
    replies: Arc<RwLock<HashMap<String, CannedReply>>>,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockEndpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Default::default(),
            delay: None,
            calls: Default::default(),
        }
    }

    pub fn with_solutions(self, sparql: impl Into<String>, solutions: Vec<RawSolution>) -> Self {
        self.replies
            .write()
            .unwrap()
            .insert(sparql.into(), CannedReply::Solutions(solutions));
        self
    }

    pub fn with_failure(self, sparql: impl Into<String>, failure: MockFailure) -> Self {
        self.replies
            .write()
            .unwrap()
            .insert(sparql.into(), CannedReply::Failure(failure));
        self
    }

    /// Wait this long before answering each query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Query texts received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    fn error(&self, sparql: &str, failure: MockFailure) -> EndpointError {
        let endpoint = self.name.clone();
        let sparql = sparql.to_string();
        match failure {
            MockFailure::Timeout => EndpointError::Timeout { endpoint, sparql },
            MockFailure::Temporary => EndpointError::Temporary {
                endpoint,
                sparql,
                message: "HTTP 503".to_string(),
            },
            MockFailure::Persistent => EndpointError::Persistent {
                endpoint,
                sparql,
                message: "HTTP 404".to_string(),
            },
            MockFailure::Unexpected => EndpointError::Unexpected {
                endpoint,
                sparql,
                message: "HTTP 400".to_string(),
            },
        }
    }
}

#[async_trait]
impl EndpointAccessor for MockEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, sparql: &str) -> EndpointResult<Vec<RawSolution>> {
        self.calls.write().unwrap().push(sparql.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.read().unwrap().get(sparql).cloned();
        match reply {
            Some(CannedReply::Solutions(solutions)) => Ok(solutions),
            Some(CannedReply::Failure(failure)) => Err(self.error(sparql, failure)),
            None => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// URL forwarding service
// ============================================================================

/// A reference resolver with canned candidates per URI.
///
/// Unknown URIs yield no data, like an unreachable service.
#[derive(Default)]
pub struct MockReferences {
    candidates: Arc<RwLock<HashMap<String, Vec<UrlCandidate>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(self, uri: impl Into<String>, candidates: Vec<UrlCandidate>) -> Self {
        self.candidates.write().unwrap().insert(uri.into(), candidates);
        self
    }

    /// Answer `uri` with an undecodable response.
    pub fn with_failure(self, uri: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(uri.into());
        self
    }

    /// URIs resolved, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl ReferenceResolver for MockReferences {
    async fn resolve(&self, uri: &str) -> Result<Option<Vec<UrlCandidate>>, ReferenceError> {
        self.calls.write().unwrap().push(uri.to_string());

        if self.failing.read().unwrap().contains(uri) {
            let error = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
            return Err(ReferenceError::Decode(error));
        }
        Ok(self.candidates.read().unwrap().get(uri).cloned())
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Yields a fixed list of anchored patterns regardless of input.
#[derive(Default)]
pub struct ScriptedAnchors {
    patterns: Vec<AnchoredPattern>,
}

impl ScriptedAnchors {
    pub fn new(patterns: Vec<AnchoredPattern>) -> Self {
        Self { patterns }
    }
}

impl PatternAnchorGenerator for ScriptedAnchors {
    fn anchor<'a>(&'a self, _pgp: &'a Pgp, _mappings: &'a Mappings) -> AnchoredPatterns<'a> {
        Box::new(self.patterns.iter().cloned())
    }
}

/// Yields fixed query texts per anchored pattern.
///
/// Patterns without a script get the default list, empty unless set.
#[derive(Default)]
pub struct ScriptedQueries {
    scripts: Vec<(AnchoredPattern, Vec<String>)>,
    default: Vec<String>,
}

impl ScriptedQueries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queries(mut self, pattern: AnchoredPattern, queries: &[&str]) -> Self {
        self.scripts
            .push((pattern, queries.iter().map(|q| q.to_string()).collect()));
        self
    }

    pub fn with_default(mut self, queries: &[&str]) -> Self {
        self.default = queries.iter().map(|q| q.to_string()).collect();
        self
    }
}

impl QueryGenerator for ScriptedQueries {
    fn queries<'a>(
        &'a self,
        anchored: &'a AnchoredPattern,
        _options: &'a QueryOptions,
    ) -> Queries<'a> {
        let queries = self
            .scripts
            .iter()
            .find(|(pattern, _)| pattern == anchored)
            .map(|(_, queries)| queries)
            .unwrap_or(&self.default);

        Box::new(queries.iter().map(|q| (Bgp::default(), q.clone())))
    }
}

// ============================================================================
// Backends
// ============================================================================

/// A request made to [`MockBackends`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendRequest {
    Parser { url: String },
    TermMapper { url: String },
    Endpoint {
        url: String,
        parallel: usize,
        read_timeout: Duration,
    },
    References { url: String },
}

/// Backends that hand out the same mocks for every URL.
///
/// Defaults: an empty [`MockParserService`], [`MockTermMapper`],
/// [`MockEndpoint`] and [`MockReferences`], with the real
/// [`CartesianAnchors`] and [`PathQueryGenerator`].
pub struct MockBackends {
    parser: Arc<dyn ParserService>,
    term_mapper: Arc<dyn TermMapper>,
    endpoint: Arc<dyn EndpointAccessor>,
    references: Arc<dyn ReferenceResolver>,
    anchors: Arc<dyn PatternAnchorGenerator>,
    query_generator: Arc<dyn QueryGenerator>,
    requests: Arc<RwLock<Vec<BackendRequest>>>,
}

impl Default for MockBackends {
    fn default() -> Self {
        Self {
            parser: Arc::new(MockParserService::new()),
            term_mapper: Arc::new(MockTermMapper::new()),
            endpoint: Arc::new(MockEndpoint::new("mock")),
            references: Arc::new(MockReferences::new()),
            anchors: Arc::new(CartesianAnchors::new()),
            query_generator: Arc::new(PathQueryGenerator::new()),
            requests: Default::default(),
        }
    }
}

impl MockBackends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(mut self, parser: Arc<dyn ParserService>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_term_mapper(mut self, term_mapper: Arc<dyn TermMapper>) -> Self {
        self.term_mapper = term_mapper;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Arc<dyn EndpointAccessor>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_references(mut self, references: Arc<dyn ReferenceResolver>) -> Self {
        self.references = references;
        self
    }

    pub fn with_anchors(mut self, anchors: Arc<dyn PatternAnchorGenerator>) -> Self {
        self.anchors = anchors;
        self
    }

    pub fn with_query_generator(mut self, query_generator: Arc<dyn QueryGenerator>) -> Self {
        self.query_generator = query_generator;
        self
    }

    /// Requests made so far, in order.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.read().unwrap().clone()
    }

    fn record(&self, request: BackendRequest) {
        self.requests.write().unwrap().push(request);
    }
}

impl Backends for MockBackends {
    fn parser(&self, parser_url: &str) -> Arc<dyn ParserService> {
        self.record(BackendRequest::Parser {
            url: parser_url.to_string(),
        });
        Arc::clone(&self.parser)
    }

    fn term_mapper(&self, dictionary_url: &str) -> Arc<dyn TermMapper> {
        self.record(BackendRequest::TermMapper {
            url: dictionary_url.to_string(),
        });
        Arc::clone(&self.term_mapper)
    }

    fn endpoint(
        &self,
        endpoint_url: &str,
        parallel: usize,
        read_timeout: Duration,
    ) -> Arc<dyn EndpointAccessor> {
        self.record(BackendRequest::Endpoint {
            url: endpoint_url.to_string(),
            parallel,
            read_timeout,
        });
        Arc::clone(&self.endpoint)
    }

    fn references(&self, references_url: &str) -> Arc<dyn ReferenceResolver> {
        self.record(BackendRequest::References {
            url: references_url.to_string(),
        });
        Arc::clone(&self.references)
    }

    fn anchors(&self) -> Arc<dyn PatternAnchorGenerator> {
        Arc::clone(&self.anchors)
    }

    fn query_generator(&self) -> Arc<dyn QueryGenerator> {
        Arc::clone(&self.query_generator)
    }
}
