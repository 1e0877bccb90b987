//! End-to-end runs of the orchestrator against mock backends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use graph_qa::clients::HttpReferenceResolver;
use graph_qa::events::QueryFailure;
use graph_qa::orchestrator::answers::label_query;
use graph_qa::testing::{
    BackendRequest, MockBackends, MockEndpoint, MockFailure, MockParserService, MockReferences,
    MockTermMapper, ScriptedAnchors, ScriptedQueries,
};
use graph_qa::types::answer::{Forwarding, RawSolution, RdfTerm, Rendering, UrlCandidate};
use graph_qa::types::pattern::AnchoredNode;
use graph_qa::{
    AnchoredPattern, Dataset, Event, EventKind, GatewayFailure, OrchestratorConfig,
    OrchestratorError, QueryOrchestrator, RunOutcome, RunState,
};

const QUESTION: &str = "What treats chronic headache ?";

const TREATS: &str = "\
0\tROOT\tROOT\tROOT\tROOT\tROOT\tARG1:2
1\tWhat\twhat\tWP\tWP\tnoun_arg0
2\ttreats\ttreat\tVBZ\tVBZ\tverb_arg12\tARG1:1 ARG2:4
3\tchronic\tchronic\tJJ\tJJ\tadj_arg1
4\theadache\theadache\tNN\tNN\tnoun_arg0
5\t?\t?\t.\t.\tpunct";

const HEADACHE: &str = "http://example.org/ChronicHeadache";
const ASPIRIN: &str = "http://example.org/Aspirin";

fn dataset() -> Dataset {
    Dataset::new(
        "biomed",
        "http://sparql.example.org/sparql",
        "http://dictionary.example.org/find",
    )
    .with_number(1)
}

fn parser() -> Arc<MockParserService> {
    Arc::new(MockParserService::new().with_response(QUESTION, TREATS))
}

fn anchored(term: &str) -> AnchoredPattern {
    AnchoredPattern {
        nodes: vec![
            AnchoredNode {
                id: "t1".into(),
                head: 0,
                text: "What".into(),
                term: None,
            },
            AnchoredNode {
                id: "t2".into(),
                head: 3,
                text: "chronic headache".into(),
                term: Some(term.into()),
            },
        ],
        edges: vec![],
        focus: "t1".into(),
    }
}

fn focus_binding(uri: &str) -> RawSolution {
    let mut solution = RawSolution::new();
    solution.insert("it1".into(), RdfTerm::uri(uri));
    solution.insert("p1_1".into(), RdfTerm::uri("http://example.org/treats"));
    solution
}

fn orchestrator(backends: MockBackends) -> QueryOrchestrator {
    QueryOrchestrator::new(
        dataset(),
        QUESTION,
        "run-1",
        OrchestratorConfig::new(),
        Arc::new(backends),
    )
}

fn record(orchestrator: &QueryOrchestrator) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    orchestrator.on(&EventKind::ALL, move |event| {
        sink.lock().unwrap().push(event.clone())
    });
    events
}

fn kinds(events: &Mutex<Vec<Event>>) -> Vec<EventKind> {
    events.lock().unwrap().iter().map(Event::kind).collect()
}

fn count(events: &Mutex<Vec<Event>>, kind: EventKind) -> usize {
    kinds(events).into_iter().filter(|k| *k == kind).count()
}

fn dispatched(events: &Mutex<Vec<Event>>) -> Vec<(usize, String)> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::Sparql(q) => Some((q.sparql.number, q.sparql.query.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_full_pipeline_finds_labelled_answer() {
    let first_query = format!("SELECT DISTINCT * WHERE {{ ?it1 ?p1_1 <{HEADACHE}> . }}");
    let mut label = RawSolution::new();
    label.insert("label".into(), RdfTerm::literal("Aspirin"));

    let endpoint = Arc::new(
        MockEndpoint::new("sparql.example.org")
            .with_solutions(first_query.clone(), vec![focus_binding(ASPIRIN)])
            .with_solutions(label_query(ASPIRIN), vec![label]),
    );
    let references = Arc::new(MockReferences::new().with_candidates(
        ASPIRIN,
        vec![UrlCandidate {
            matching_score: 1.0,
            priority: 1.0,
            forwarding: Forwarding {
                url: "http://drugs.example.org/aspirin".into(),
            },
            rendering: Some(Rendering {
                mime_type: Some("image/png".into()),
                url: Some("http://drugs.example.org/aspirin.png".into()),
            }),
        }],
    ));
    let backends = Arc::new(
        MockBackends::new()
            .with_parser(parser())
            .with_term_mapper(Arc::new(
                MockTermMapper::new().with_mapping("chronic headache", &[HEADACHE]),
            ))
            .with_endpoint(endpoint.clone())
            .with_references(references.clone()),
    );
    let orchestrator = QueryOrchestrator::new(
        dataset(),
        QUESTION,
        "run-1",
        OrchestratorConfig::new(),
        backends.clone(),
    );
    let events = record(&orchestrator);

    let outcome = orchestrator.perform().await.unwrap();

    let kinds = kinds(&events);
    assert_eq!(
        &kinds[..3],
        &[EventKind::Datasets, EventKind::Pgp, EventKind::Mappings]
    );
    // max_hop 2 over one edge: 2 one-hop and 4 two-hop shapes
    assert_eq!(count(&events, EventKind::Sparql), 6);
    assert_eq!(count(&events, EventKind::QuerySparql), 6);
    assert_eq!(count(&events, EventKind::Solutions), 6);
    assert_eq!(count(&events, EventKind::Answer), 1);
    assert_eq!(dispatched(&events)[0], (1, first_query));

    let answer = events
        .lock()
        .unwrap()
        .iter()
        .find_map(|e| match e {
            Event::Answer { answer, solution, .. } => Some((answer.clone(), solution.clone())),
            _ => None,
        })
        .unwrap();
    assert_eq!(answer.0.uri, ASPIRIN);
    assert_eq!(answer.0.label, "Aspirin");
    assert_eq!(answer.0.urls.as_ref().map(Vec::len), Some(1));
    assert_eq!(
        answer.0.first_rendering.and_then(|r| r.url).as_deref(),
        Some("http://drugs.example.org/aspirin.png")
    );
    assert_eq!(answer.1["it1"], ASPIRIN);
    assert_eq!(references.calls(), vec![ASPIRIN.to_string()]);

    match outcome {
        RunOutcome::Completed(Some(stats)) => {
            assert_eq!(stats.sparqls, 6);
            assert_eq!(stats.success, 6);
            assert_eq!(stats.error, 0);
            assert_eq!(stats.parallel, 16);
            assert_eq!(stats.dataset.name, "biomed");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(orchestrator.state(), RunState::Completed);

    let requests = backends.requests();
    assert!(requests.contains(&BackendRequest::Parser {
        url: "http://enju-gtrec.dbcls.jp".into()
    }));
    assert!(requests.contains(&BackendRequest::Endpoint {
        url: "http://sparql.example.org/sparql".into(),
        parallel: 16,
        read_timeout: Duration::from_secs(5),
    }));
}

#[tokio::test]
async fn test_duplicate_queries_dispatched_once() {
    let first = anchored("http://example.org/A");
    let second = anchored("http://example.org/B");
    let endpoint = Arc::new(MockEndpoint::new("kb"));
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint.clone())
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![first.clone(), second.clone()])))
        .with_query_generator(Arc::new(
            ScriptedQueries::new()
                .with_queries(first, &["q1", "shared"])
                .with_queries(second, &["shared", "q3"]),
        ));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);

    orchestrator.perform().await.unwrap();

    assert_eq!(
        dispatched(&events),
        vec![
            (1, "q1".to_string()),
            (2, "shared".to_string()),
            (3, "q3".to_string())
        ]
    );
    assert_eq!(count(&events, EventKind::QuerySparql), 3);
    assert_eq!(
        endpoint.calls().iter().filter(|q| *q == "shared").count(),
        1
    );
}

#[tokio::test]
async fn test_timeout_does_not_stop_the_run() {
    let endpoint = Arc::new(MockEndpoint::new("kb").with_failure("q3", MockFailure::Timeout));
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint)
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![anchored(HEADACHE)])))
        .with_query_generator(Arc::new(
            ScriptedQueries::new().with_default(&["q1", "q2", "q3", "q4"]),
        ));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);

    let outcome = orchestrator.perform().await.unwrap();

    assert_eq!(dispatched(&events).last(), Some(&(4, "q4".to_string())));

    let failures: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::Solutions {
                query,
                solutions,
                error: Some(error),
            } => Some((query.sparql.number, solutions.len(), *error)),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![(3, 0, QueryFailure::Timeout)]);

    match outcome {
        RunOutcome::Completed(Some(stats)) => {
            assert_eq!(stats.sparqls, 4);
            assert_eq!(stats.error, 1);
            assert_eq!(stats.success, 3);
            assert!((stats.error_rate - 0.25).abs() < 1e-9);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_temporary_error_is_marked() {
    let endpoint = Arc::new(MockEndpoint::new("kb").with_failure("q1", MockFailure::Temporary));
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint)
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![anchored(HEADACHE)])))
        .with_query_generator(Arc::new(ScriptedQueries::new().with_default(&["q1"])));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);

    orchestrator.perform().await.unwrap();

    let json: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.kind() == EventKind::Solutions)
        .map(|e| serde_json::to_value(e).unwrap())
        .collect();
    assert_eq!(json.len(), 1);
    assert_eq!(json[0]["error"], "endpoint temporary error");
}

#[tokio::test]
async fn test_unreachable_references_still_answer() {
    let endpoint = Arc::new(
        MockEndpoint::new("kb").with_solutions("q1", vec![focus_binding(ASPIRIN)]),
    );
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint)
        .with_references(Arc::new(HttpReferenceResolver::new("http://127.0.0.1:1")))
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![anchored(HEADACHE)])))
        .with_query_generator(Arc::new(ScriptedQueries::new().with_default(&["q1"])));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);

    orchestrator.perform().await.unwrap();

    let answers: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::Answer { answer, .. } => Some(answer.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].uri, ASPIRIN);
    assert_eq!(answers[0].label, "");
    assert!(answers[0].urls.is_none());
    assert!(answers[0].first_rendering.is_none());
}

#[tokio::test]
async fn test_failing_reference_lookup_skips_answer() {
    let endpoint = Arc::new(
        MockEndpoint::new("kb").with_solutions("q1", vec![focus_binding(ASPIRIN)]),
    );
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint)
        .with_references(Arc::new(MockReferences::new().with_failure(ASPIRIN)))
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![anchored(HEADACHE)])))
        .with_query_generator(Arc::new(ScriptedQueries::new().with_default(&["q1"])));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);

    let outcome = orchestrator.perform().await.unwrap();

    assert_eq!(count(&events, EventKind::Solutions), 1);
    assert_eq!(count(&events, EventKind::Answer), 0);
    assert!(matches!(outcome, RunOutcome::Completed(Some(_))));
}

#[tokio::test]
async fn test_parser_failure_is_gateway_error() {
    let orchestrator = orchestrator(MockBackends::new());
    let events = record(&orchestrator);

    let outcome = orchestrator.perform().await.unwrap();

    assert_eq!(outcome, RunOutcome::GatewayError(GatewayFailure::Parser));
    assert_eq!(
        kinds(&events),
        vec![EventKind::Datasets, EventKind::GatewayError]
    );
    let json = serde_json::to_value(&events.lock().unwrap()[1]).unwrap();
    assert_eq!(json["error_message"], "enju access error");
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[tokio::test]
async fn test_dictionary_failure_is_gateway_error() {
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_term_mapper(Arc::new(MockTermMapper::failing()));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);

    let outcome = orchestrator.perform().await.unwrap();

    assert_eq!(outcome, RunOutcome::GatewayError(GatewayFailure::Dictionary));
    assert_eq!(
        kinds(&events),
        vec![EventKind::Datasets, EventKind::Pgp, EventKind::GatewayError]
    );
    let json = serde_json::to_value(&events.lock().unwrap()[2]).unwrap();
    assert_eq!(json["error_message"], "dictionary lookup error");
}

#[tokio::test]
async fn test_cancel_before_perform() {
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![anchored(HEADACHE)])))
        .with_query_generator(Arc::new(ScriptedQueries::new().with_default(&["q1"])));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);

    orchestrator.cancel();
    let outcome = orchestrator.perform().await.unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(count(&events, EventKind::Sparql), 0);
    assert_eq!(orchestrator.state(), RunState::Cancelled);
}

#[tokio::test]
async fn test_cancel_from_handler_stops_dispatch() {
    let endpoint = Arc::new(MockEndpoint::new("kb"));
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint)
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![anchored(HEADACHE)])))
        .with_query_generator(Arc::new(
            ScriptedQueries::new().with_default(&["q1", "q2", "q3"]),
        ));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);
    let token = orchestrator.cancel_token();
    orchestrator.on(&[EventKind::Sparql], move |_| token.cancel());

    let outcome = orchestrator.perform().await.unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(dispatched(&events), vec![(1, "q1".to_string())]);
    assert_eq!(count(&events, EventKind::QuerySparql), 1);
}

#[tokio::test]
async fn test_detached_query_still_publishes_after_cancel() {
    let endpoint = Arc::new(
        MockEndpoint::new("kb")
            .with_solutions("q1", vec![focus_binding(ASPIRIN)])
            .with_delay(Duration::from_millis(20)),
    );
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint)
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![anchored(HEADACHE)])))
        .with_query_generator(Arc::new(
            ScriptedQueries::new().with_default(&["q1", "q2"]),
        ));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);
    let token = orchestrator.cancel_token();
    orchestrator.on(&[EventKind::QuerySparql], move |_| token.cancel());

    let outcome = orchestrator.perform().await.unwrap();
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(count(&events, EventKind::Solutions), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(count(&events, EventKind::Solutions), 1);
    assert_eq!(count(&events, EventKind::Answer), 1);
}

#[tokio::test]
async fn test_cancel_during_drain_completes_run() {
    let endpoint = Arc::new(
        MockEndpoint::new("kb")
            .with_solutions("q1", vec![focus_binding(ASPIRIN)])
            .with_delay(Duration::from_millis(50)),
    );
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint.clone())
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![anchored(HEADACHE)])))
        .with_query_generator(Arc::new(
            ScriptedQueries::new().with_default(&["q1", "q2"]),
        ));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);
    let token = orchestrator.cancel_token();
    // Fires after the last query is dispatched, while both are still in flight.
    orchestrator.on(&[EventKind::QuerySparql], move |event| {
        if let Event::QuerySparql(query) = event {
            if query.sparql.number == 2 {
                token.cancel();
            }
        }
    });

    let outcome = orchestrator.perform().await.unwrap();

    match outcome {
        RunOutcome::Completed(Some(stats)) => {
            assert_eq!(stats.sparqls, 2);
            assert_eq!(stats.success, 2);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(endpoint.calls().len(), 3);
    assert_eq!(count(&events, EventKind::Solutions), 2);
    assert_eq!(count(&events, EventKind::Answer), 1);
    assert_eq!(orchestrator.state(), RunState::Completed);
}

#[tokio::test]
async fn test_persistent_error_aborts_run() {
    let endpoint = Arc::new(MockEndpoint::new("kb").with_failure("q1", MockFailure::Persistent));
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_endpoint(endpoint.clone())
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![
            anchored(HEADACHE),
            anchored("http://example.org/Migraine"),
        ])))
        .with_query_generator(Arc::new(
            ScriptedQueries::new().with_default(&["q1", "q2", "q3", "q4"]),
        ));
    let orchestrator = orchestrator(backends);
    let events = record(&orchestrator);

    let outcome = orchestrator.perform().await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Aborted {
            endpoint: "kb".to_string()
        }
    );
    // q1 fails before q2 is enumerated; nothing else is issued.
    assert_eq!(dispatched(&events), vec![(1, "q1".to_string())]);
    assert_eq!(endpoint.calls(), vec!["q1".to_string()]);
    assert_eq!(count(&events, EventKind::QuerySparql), 1);
    assert_eq!(count(&events, EventKind::Solutions), 0);
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[tokio::test]
async fn test_perform_runs_once() {
    let backends = MockBackends::new().with_parser(parser());
    let orchestrator = orchestrator(backends);

    orchestrator.perform().await.unwrap();
    let second = orchestrator.perform().await;

    assert!(matches!(
        second,
        Err(OrchestratorError::AlreadyStarted { run_id }) if run_id == "run-1"
    ));
}

#[tokio::test]
async fn test_pattern_is_parsed_once() {
    let parser = parser();
    let backends = MockBackends::new().with_parser(parser.clone());
    let orchestrator = orchestrator(backends);

    let pgp = orchestrator.pgp().await.unwrap();
    assert_eq!(pgp.nodes.len(), 2);
    assert_eq!(pgp.focus, "t1");

    orchestrator.perform().await.unwrap();
    assert_eq!(parser.calls().len(), 1);
}

#[tokio::test]
async fn test_nothing_dispatched_has_no_stats() {
    let backends = MockBackends::new()
        .with_parser(parser())
        .with_anchors(Arc::new(ScriptedAnchors::new(vec![])));
    let orchestrator = orchestrator(backends);

    let outcome = orchestrator.perform().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed(None));
}
