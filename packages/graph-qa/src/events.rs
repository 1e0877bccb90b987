//! Typed events of an orchestration run and a synchronous emitter for them.
//!
//! Handlers are plain closures invoked on the emitting task, in the order
//! they were registered. A handler registered for several kinds is called
//! once per matching event.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::types::answer::{Answer, Solution};
use crate::types::dataset::DatasetSummary;
use crate::types::pattern::{AnchoredPattern, Bgp, Mappings, Pgp, SparqlQuery};

/// The kinds of event a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Datasets,
    Pgp,
    Mappings,
    Sparql,
    QuerySparql,
    Solutions,
    Answer,
    GatewayError,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Datasets,
        EventKind::Pgp,
        EventKind::Mappings,
        EventKind::Sparql,
        EventKind::QuerySparql,
        EventKind::Solutions,
        EventKind::Answer,
        EventKind::GatewayError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Datasets => "datasets",
            EventKind::Pgp => "pgp",
            EventKind::Mappings => "mappings",
            EventKind::Sparql => "sparql",
            EventKind::QuerySparql => "query_sparql",
            EventKind::Solutions => "solutions",
            EventKind::Answer => "answer",
            EventKind::GatewayError => "gateway_error",
        }
    }
}

/// Why a query produced no solutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryFailure {
    #[serde(rename = "sparql timeout error")]
    Timeout,
    #[serde(rename = "endpoint temporary error")]
    Temporary,
}

impl QueryFailure {
    pub fn message(&self) -> &'static str {
        match self {
            QueryFailure::Timeout => "sparql timeout error",
            QueryFailure::Temporary => "endpoint temporary error",
        }
    }
}

/// Which upstream service failed before any query was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayFailure {
    Parser,
    Dictionary,
}

impl GatewayFailure {
    pub fn message(&self) -> &'static str {
        match self {
            GatewayFailure::Parser => "enju access error",
            GatewayFailure::Dictionary => "dictionary lookup error",
        }
    }
}

/// Context shared by every event about one dispatched query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryEvent {
    pub dataset: DatasetSummary,
    pub pgp: Arc<Pgp>,
    pub mappings: Arc<Mappings>,
    pub anchored_pgp: Arc<AnchoredPattern>,
    pub bgp: Arc<Bgp>,
    pub sparql: SparqlQuery,
}

/// An event of an orchestration run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Datasets {
        dataset: DatasetSummary,
    },
    Pgp {
        dataset: DatasetSummary,
        pgp: Arc<Pgp>,
    },
    Mappings {
        dataset: DatasetSummary,
        pgp: Arc<Pgp>,
        mappings: Arc<Mappings>,
    },
    Sparql(QueryEvent),
    QuerySparql(QueryEvent),
    Solutions {
        #[serde(flatten)]
        query: QueryEvent,
        solutions: Arc<Vec<Solution>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<QueryFailure>,
    },
    Answer {
        #[serde(flatten)]
        query: QueryEvent,
        solutions: Arc<Vec<Solution>>,
        solution: Solution,
        answer: Answer,
    },
    GatewayError {
        dataset: DatasetSummary,
        error_message: String,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Datasets { .. } => EventKind::Datasets,
            Event::Pgp { .. } => EventKind::Pgp,
            Event::Mappings { .. } => EventKind::Mappings,
            Event::Sparql(_) => EventKind::Sparql,
            Event::QuerySparql(_) => EventKind::QuerySparql,
            Event::Solutions { .. } => EventKind::Solutions,
            Event::Answer { .. } => EventKind::Answer,
            Event::GatewayError { .. } => EventKind::GatewayError,
        }
    }

    pub fn dataset(&self) -> &DatasetSummary {
        match self {
            Event::Datasets { dataset }
            | Event::Pgp { dataset, .. }
            | Event::Mappings { dataset, .. }
            | Event::GatewayError { dataset, .. } => dataset,
            Event::Sparql(query)
            | Event::QuerySparql(query)
            | Event::Solutions { query, .. }
            | Event::Answer { query, .. } => &query.dataset,
        }
    }
}

/// Handle returned by [`EventEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kinds: Vec<EventKind>,
    handler: Handler,
}

/// Publish/subscribe registry scoped to one orchestrator.
#[derive(Default)]
pub struct EventEmitter {
    next_id: AtomicU64,
    subscriptions: RwLock<Vec<Subscription>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for the given kinds.
    pub fn on<F>(&self, kinds: &[EventKind], handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Subscription {
            id,
            kinds: kinds.to_vec(),
            handler: Arc::new(handler),
        };
        self.subscriptions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(subscription);
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Deliver `event` to every matching handler.
    ///
    /// The handler list is copied before delivery, so handlers may call
    /// `on`/`off` without deadlocking; such changes apply from the next event.
    pub fn emit(&self, event: &Event) -> usize {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .subscriptions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|s| s.kinds.contains(&kind))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
