//! Incremental query orchestration.
//!
//! One control task enumerates anchored patterns and their queries,
//! dispatches each new query on its own task, and then waits for exactly as
//! many completions as it dispatched. Results flow back to subscribers as
//! [`Event`]s.
//!
//! # Usage
//!
//! ```rust,ignore
//! use graph_qa::{Dataset, EventKind, HttpBackends, OrchestratorConfig, QueryOrchestrator};
//!
//! let dataset = Dataset::new("biomed", "http://sparql.example.org/sparql", "http://dict.example.org/find");
//! let orchestrator = QueryOrchestrator::new(
//!     dataset,
//!     "Which drugs treat headache?",
//!     "run-1",
//!     OrchestratorConfig::from_env(),
//!     Arc::new(HttpBackends::new()?),
//! );
//! orchestrator.on(&[EventKind::Answer], |event| println!("{event:?}"));
//! let outcome = orchestrator.perform().await?;
//! ```

pub mod answers;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{mpsc, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::error::{EndpointError, EndpointResult, OrchestratorError, ParserError, ParserResult};
use crate::events::{
    Event, EventEmitter, EventKind, GatewayFailure, QueryEvent, QueryFailure, SubscriptionId,
};
use crate::parser::{PatternFactory, SentenceParser};
use crate::traits::backends::Backends;
use crate::traits::endpoint::{query_async, EndpointAccessor};
use crate::traits::references::ReferenceResolver;
use crate::types::answer::{to_plain, RawSolution, RunStats};
use crate::types::config::{OrchestratorConfig, QueryOptions};
use crate::types::dataset::{Dataset, DatasetSummary};
use crate::types::pattern::{Pgp, SparqlQuery};

/// Queries in flight per run.
pub const PARALLEL: usize = 16;

/// Lifecycle of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every dispatched query completed. Stats are absent when nothing was
    /// dispatched.
    Completed(Option<RunStats>),

    /// Stopped by [`QueryOrchestrator::cancel`] during enumeration.
    /// Outstanding queries were left running and still publish their events.
    Cancelled,

    /// The endpoint reported a persistent error; no further queries were
    /// issued and the ones already dispatched were drained.
    Aborted { endpoint: String },

    /// The parser or the dictionary failed; a `gateway_error` event was
    /// emitted.
    GatewayError(GatewayFailure),

    /// Any other failure, logged at error level.
    Failed(String),
}

impl RunOutcome {
    fn state(&self) -> RunState {
        match self {
            RunOutcome::Completed(_) => RunState::Completed,
            RunOutcome::Cancelled => RunState::Cancelled,
            RunOutcome::Aborted { .. } | RunOutcome::GatewayError(_) | RunOutcome::Failed(_) => {
                RunState::Failed
            }
        }
    }
}

/// Emits events, logging each one in debug mode.
#[derive(Clone)]
struct Publisher {
    events: Arc<EventEmitter>,
    debug: bool,
}

impl Publisher {
    fn publish(&self, event: Event) {
        if self.debug {
            info!(event = event.kind().as_str(), "Emitting event");
        }
        self.events.emit(&event);
    }
}

/// Everything a dispatched query needs once its result arrives.
struct Dispatched {
    publisher: Publisher,
    endpoint: Arc<dyn EndpointAccessor>,
    references: Arc<dyn ReferenceResolver>,
    query: QueryEvent,
    completions: mpsc::UnboundedSender<bool>,
    abort: CancellationToken,
    aborted_by: Arc<Mutex<Option<String>>>,
}

impl Dispatched {
    async fn complete(self, result: EndpointResult<Vec<RawSolution>>) {
        let success = result.is_ok();
        match result {
            Ok(raw) => self.answer(raw).await,
            Err(EndpointError::Timeout { endpoint, sparql }) => {
                debug!(
                    endpoint = %endpoint,
                    sparql = %sparql,
                    "SPARQL timed out, continuing with the next query"
                );
                self.fail(QueryFailure::Timeout);
            }
            Err(e @ EndpointError::Temporary { .. }) => {
                info!(
                    endpoint = %e.endpoint(),
                    sparql = %e.sparql(),
                    error = %e,
                    "Endpoint returned a temporary error, continuing with the next query"
                );
                self.fail(QueryFailure::Temporary);
            }
            Err(e @ EndpointError::Persistent { .. }) => {
                info!(
                    endpoint = %e.endpoint(),
                    error = %e,
                    "Endpoint has a persistent error, no further queries will be issued"
                );
                if let Ok(mut slot) = self.aborted_by.lock() {
                    slot.get_or_insert_with(|| e.endpoint().to_string());
                }
                self.abort.cancel();
            }
            Err(e @ EndpointError::Unexpected { .. }) => {
                error!(endpoint = %e.endpoint(), sparql = %e.sparql(), error = %e, "SPARQL query failed");
            }
        }

        // The receiver is gone once the run was cancelled.
        let _ = self.completions.send(success);
    }

    fn fail(&self, failure: QueryFailure) {
        self.publisher.publish(Event::Solutions {
            query: self.query.clone(),
            solutions: Arc::new(Vec::new()),
            error: Some(failure),
        });
    }

    async fn answer(&self, raw: Vec<RawSolution>) {
        let solutions = Arc::new(to_plain(&raw));
        self.publisher.publish(Event::Solutions {
            query: self.query.clone(),
            solutions: Arc::clone(&solutions),
            error: None,
        });

        let focus = &self.query.anchored_pgp.focus;
        for solution in solutions.iter() {
            for (variable, uri) in solution {
                if !answers::binds_focus(variable, focus) {
                    continue;
                }

                match answers::resolve_answer(self.endpoint.as_ref(), self.references.as_ref(), uri)
                    .await
                {
                    Ok(answer) => self.publisher.publish(Event::Answer {
                        query: self.query.clone(),
                        solutions: Arc::clone(&solutions),
                        solution: solution.clone(),
                        answer,
                    }),
                    Err(e) => error!(uri = %uri, error = %e, "Reference lookup failed, skipping answer"),
                }
            }
        }
    }
}

/// Coordinates one question against one dataset.
pub struct QueryOrchestrator {
    dataset: Dataset,
    question: String,
    run_id: String,
    config: OrchestratorConfig,
    backends: Arc<dyn Backends>,
    events: Arc<EventEmitter>,
    cancel: CancellationToken,
    state: Mutex<RunState>,
    pgp: OnceCell<Arc<Pgp>>,
}

impl QueryOrchestrator {
    pub fn new(
        dataset: Dataset,
        question: impl Into<String>,
        run_id: impl Into<String>,
        config: OrchestratorConfig,
        backends: Arc<dyn Backends>,
    ) -> Self {
        Self {
            dataset,
            question: question.into(),
            run_id: run_id.into(),
            config,
            backends,
            events: Arc::new(EventEmitter::new()),
            cancel: CancellationToken::new(),
            state: Mutex::new(RunState::Idle),
            pgp: OnceCell::new(),
        }
    }

    /// Subscribe to events of this run.
    ///
    /// Handlers run synchronously on the task that emits the event, which
    /// is a query task for `solutions` and `answer`.
    pub fn on<F>(&self, kinds: &[EventKind], handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.on(kinds, handler)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    /// Ask the run to stop issuing new queries.
    ///
    /// Polled before each anchored pattern and each query. Queries already
    /// dispatched run to completion and publish their results.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run, for use from handlers or other tasks.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// The semantic pattern of the question, parsed on first use.
    pub async fn pgp(&self) -> ParserResult<Arc<Pgp>> {
        self.pgp
            .get_or_try_init(|| async {
                let parser_url = self.config.parser_url_for(&self.dataset);
                let parser = SentenceParser::new(self.backends.parser(parser_url));
                let parse = parser.parse(&self.question).await?;
                Ok::<_, ParserError>(Arc::new(PatternFactory::create(&parse, &self.question)))
            })
            .await
            .cloned()
    }

    /// Run the question to completion, cancellation or failure.
    ///
    /// May be called once per instance.
    pub async fn perform(&self) -> Result<RunOutcome, OrchestratorError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if *state != RunState::Idle {
                return Err(OrchestratorError::AlreadyStarted {
                    run_id: self.run_id.clone(),
                });
            }
            *state = RunState::Running;
        }

        let span = info_span!("run", run_id = %self.run_id, dataset = %self.dataset.name);
        let outcome = self.run().instrument(span).await;

        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = outcome.state();
        Ok(outcome)
    }

    async fn run(&self) -> RunOutcome {
        let publisher = Publisher {
            events: Arc::clone(&self.events),
            debug: self.config.debug,
        };
        let summary = self.dataset.summary();

        publisher.publish(Event::Datasets {
            dataset: summary.clone(),
        });

        let pgp = match self.pgp().await {
            Ok(pgp) => pgp,
            Err(e) => {
                debug!(error = %e, "Parser failed");
                return self.gateway_error(&publisher, summary, GatewayFailure::Parser);
            }
        };
        publisher.publish(Event::Pgp {
            dataset: summary.clone(),
            pgp: Arc::clone(&pgp),
        });

        let term_mapper = self.backends.term_mapper(&self.dataset.dictionary_url);
        let mappings = match term_mapper.find(&pgp.keywords()).await {
            Ok(mappings) => Arc::new(mappings),
            Err(e) => {
                debug!(error = %e, "Dictionary lookup failed");
                return self.gateway_error(&publisher, summary, GatewayFailure::Dictionary);
            }
        };
        publisher.publish(Event::Mappings {
            dataset: summary.clone(),
            pgp: Arc::clone(&pgp),
            mappings: Arc::clone(&mappings),
        });

        let endpoint =
            self.backends
                .endpoint(&self.dataset.endpoint_url, PARALLEL, self.config.read_timeout);
        let references = self.backends.references(&self.config.references_url);
        let anchors = self.backends.anchors();
        let generator = self.backends.query_generator();
        let options = QueryOptions::for_dataset(&self.dataset, &self.config);

        let abort = CancellationToken::new();
        let aborted_by: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let (completions, mut pending) = mpsc::unbounded_channel::<bool>();
        let mut seen: HashSet<String> = HashSet::new();
        let mut dispatched = 0usize;
        let started = Instant::now();
        let span = Span::current();

        'patterns: for anchored in anchors.anchor(&pgp, &mappings) {
            if self.cancel.is_cancelled() {
                debug!("Cancelled while enumerating anchored patterns");
                return RunOutcome::Cancelled;
            }
            if abort.is_cancelled() {
                break;
            }

            let anchored = Arc::new(anchored);
            for (bgp, sparql) in generator.queries(&anchored, &options) {
                if self.cancel.is_cancelled() {
                    debug!("Cancelled while enumerating queries");
                    return RunOutcome::Cancelled;
                }
                if abort.is_cancelled() {
                    break 'patterns;
                }
                if !seen.insert(sparql.clone()) {
                    continue;
                }

                let query = QueryEvent {
                    dataset: summary.clone(),
                    pgp: Arc::clone(&pgp),
                    mappings: Arc::clone(&mappings),
                    anchored_pgp: Arc::clone(&anchored),
                    bgp: Arc::new(bgp),
                    sparql: SparqlQuery {
                        query: sparql.clone(),
                        number: dispatched + 1,
                    },
                };
                publisher.publish(Event::Sparql(query.clone()));

                let handler = Dispatched {
                    publisher: publisher.clone(),
                    endpoint: Arc::clone(&endpoint),
                    references: Arc::clone(&references),
                    query: query.clone(),
                    completions: completions.clone(),
                    abort: abort.clone(),
                    aborted_by: Arc::clone(&aborted_by),
                };
                let task_span = span.clone();
                query_async(Arc::clone(&endpoint), sparql, move |result| {
                    handler.complete(result).instrument(task_span)
                });

                publisher.publish(Event::QuerySparql(query));
                dispatched += 1;

                // Let completions and cancellers run between dispatches.
                tokio::task::yield_now().await;
            }
        }
        drop(completions);

        let mut error = 0;
        let mut success = 0;
        // Enumeration is over; a late cancel no longer stops the drain.
        for _ in 0..dispatched {
            match pending.recv().await {
                Some(true) => success += 1,
                Some(false) => error += 1,
                None => {
                    let message = format!(
                        "completion channel closed with {} of {dispatched} queries outstanding",
                        dispatched - error - success
                    );
                    error!(error = %message, "Run failed");
                    return RunOutcome::Failed(message);
                }
            }
        }

        let stats = RunStats::compute(PARALLEL, started.elapsed(), summary, error, success);
        if let Some(stats) = &stats {
            match serde_json::to_string(stats) {
                Ok(json) => info!(stats = %json, "Finish stats"),
                Err(e) => warn!(error = %e, "Could not serialize run stats"),
            }
        }

        let aborted = aborted_by
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match aborted {
            Some(endpoint) => RunOutcome::Aborted { endpoint },
            None => RunOutcome::Completed(stats),
        }
    }

    fn gateway_error(
        &self,
        publisher: &Publisher,
        dataset: DatasetSummary,
        failure: GatewayFailure,
    ) -> RunOutcome {
        publisher.publish(Event::GatewayError {
            dataset,
            error_message: failure.message().to_string(),
        });
        RunOutcome::GatewayError(failure)
    }
}
