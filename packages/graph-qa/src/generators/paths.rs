//! Hop-bounded path queries over an anchored pattern.

use crate::traits::generators::{Queries, QueryGenerator};
use crate::types::config::QueryOptions;
use crate::types::pattern::{AnchoredPattern, Bgp, Edge, Triple};

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Expands every pattern edge into a chain of 1 to `max_hop` triples.
///
/// Each hop may point either way, so an edge of `h` hops has `2^h` shapes.
/// Queries come out ordered by the total number of hops, then by hop
/// distribution and direction. Variables:
///
/// - `?i<id>` for the focus node and for nodes without a term
/// - `?p<edge>_<hop>` for predicates
/// - `?x<edge>_<hop>` for intermediate resources
///
/// An anchored focus node is bound through its class instead of its term:
/// `?i<focus> <sortal predicate> <term>`, using the first sortal predicate
/// of the dataset or `rdf:type`.
#[derive(Debug, Clone, Default)]
pub struct PathQueryGenerator;

impl PathQueryGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl QueryGenerator for PathQueryGenerator {
    fn queries<'a>(
        &'a self,
        anchored: &'a AnchoredPattern,
        options: &'a QueryOptions,
    ) -> Queries<'a> {
        let limit = options.sparql_limit.unwrap_or(usize::MAX);
        let focus_triple = focus_triple(anchored, options);

        if anchored.edges.is_empty() {
            let single = focus_triple.map(|t| {
                let bgp = Bgp::new(vec![t]);
                let sparql = render(&bgp, options);
                (bgp, sparql)
            });
            return Box::new(single.into_iter().take(limit));
        }

        let focus_on_edge = anchored
            .edges
            .iter()
            .any(|e| e.subject == anchored.focus || e.object == anchored.focus);
        let focus_triple = focus_triple.filter(|_| focus_on_edge);

        let edges = anchored.edges.len();
        let max_hop = options.max_hop.max(1);

        let queries = (edges..=edges * max_hop)
            .flat_map(move |total| hop_distributions(edges, max_hop, total))
            .flat_map(move |hops| {
                let bits: u32 = hops.iter().sum::<usize>() as u32;
                let shapes = 1u64.checked_shl(bits).unwrap_or(u64::MAX);
                let focus_triple = focus_triple.clone();
                (0..shapes).map(move |directions| {
                    let mut triples: Vec<Triple> = focus_triple.iter().cloned().collect();
                    let mut bit = 0;
                    for (i, edge) in anchored.edges.iter().enumerate() {
                        triples.extend(edge_chain(anchored, edge, i + 1, hops[i], directions, &mut bit));
                    }
                    let bgp = Bgp::new(triples);
                    let sparql = render(&bgp, options);
                    (bgp, sparql)
                })
            })
            .take(limit);

        Box::new(queries)
    }
}

fn variable(id: &str) -> String {
    format!("?i{id}")
}

fn iri(value: &str) -> String {
    if value.starts_with('<') {
        value.to_string()
    } else {
        format!("<{value}>")
    }
}

fn node_term(anchored: &AnchoredPattern, id: &str) -> String {
    if id == anchored.focus {
        return variable(id);
    }
    match anchored.node(id).and_then(|n| n.term.as_deref()) {
        Some(term) => iri(term),
        None => variable(id),
    }
}

fn focus_triple(anchored: &AnchoredPattern, options: &QueryOptions) -> Option<Triple> {
    let term = anchored.node(&anchored.focus)?.term.as_deref()?;
    let sortal = options
        .sortal_predicates
        .first()
        .map(String::as_str)
        .unwrap_or(RDF_TYPE);
    Some(Triple::new(variable(&anchored.focus), iri(sortal), iri(term)))
}

/// Ways to split `total` hops over `edges` edges with 1..=`max_hop` each.
fn hop_distributions(edges: usize, max_hop: usize, total: usize) -> Vec<Vec<usize>> {
    if edges == 0 {
        return if total == 0 { vec![Vec::new()] } else { Vec::new() };
    }

    let mut out = Vec::new();
    for first in 1..=max_hop.min(total) {
        for mut rest in hop_distributions(edges - 1, max_hop, total - first) {
            rest.insert(0, first);
            out.push(rest);
        }
    }
    out
}

fn edge_chain(
    anchored: &AnchoredPattern,
    edge: &Edge,
    number: usize,
    hops: usize,
    directions: u64,
    bit: &mut u32,
) -> Vec<Triple> {
    let mut resources = vec![node_term(anchored, &edge.subject)];
    resources.extend((1..hops).map(|k| format!("?x{number}_{k}")));
    resources.push(node_term(anchored, &edge.object));

    resources
        .windows(2)
        .enumerate()
        .map(|(k, pair)| {
            let predicate = format!("?p{number}_{}", k + 1);
            let reversed = directions.checked_shr(*bit).unwrap_or(0) & 1 == 1;
            *bit += 1;
            if reversed {
                Triple::new(pair[1].clone(), predicate, pair[0].clone())
            } else {
                Triple::new(pair[0].clone(), predicate, pair[1].clone())
            }
        })
        .collect()
}

fn render(bgp: &Bgp, options: &QueryOptions) -> String {
    let mut body: Vec<String> = bgp.triples.iter().map(|t| t.to_string()).collect();

    if !options.ignore_predicates.is_empty() {
        let ignored = options
            .ignore_predicates
            .iter()
            .map(|p| iri(p))
            .collect::<Vec<_>>()
            .join(", ");
        for triple in &bgp.triples {
            if triple.predicate.starts_with('?') {
                body.push(format!("FILTER ({} NOT IN ({ignored}))", triple.predicate));
            }
        }
    }

    let mut sparql = format!("SELECT DISTINCT * WHERE {{ {} }}", body.join(" "));
    if let Some(limit) = options.answer_limit {
        sparql.push_str(&format!(" LIMIT {limit}"));
    }
    sparql
}
