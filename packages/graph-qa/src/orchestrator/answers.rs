//! Answer enrichment: labels from the endpoint, references from the
//! URL forwarding service.

use tracing::{debug, warn};

use crate::error::ReferenceError;
use crate::traits::endpoint::EndpointAccessor;
use crate::traits::references::ReferenceResolver;
use crate::types::answer::{Answer, Rendering, UrlCandidate};

pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

/// Forwarding URLs at or above this length are dropped.
pub const MAX_FORWARDING_URL_LEN: usize = 10_000;

/// Whether a solution variable binds the instance of the focus node.
///
/// Focus instances are bound as `?i<focus>`; one leading `i` is stripped
/// before comparing.
pub fn binds_focus(variable: &str, focus: &str) -> bool {
    variable.strip_prefix('i').unwrap_or(variable) == focus
}

pub fn label_query(uri: &str) -> String {
    format!("SELECT ?label WHERE {{ <{uri}> <{RDFS_LABEL}> ?label }}")
}

/// First `rdfs:label` of `uri`, or an empty string.
pub async fn label_of(endpoint: &dyn EndpointAccessor, uri: &str) -> String {
    match endpoint.query(&label_query(uri)).await {
        Ok(solutions) => solutions
            .iter()
            .find_map(|s| s.get("label"))
            .map(|term| term.value.clone())
            .unwrap_or_default(),
        Err(e) => {
            warn!(endpoint = %endpoint.name(), uri, error = %e, "Label lookup failed");
            String::new()
        }
    }
}

/// Order candidates by descending matching score, then descending priority,
/// and pick the first image rendering.
///
/// The rendering is chosen before overly long forwarding URLs are dropped.
pub fn rank_references(mut candidates: Vec<UrlCandidate>) -> (Vec<UrlCandidate>, Option<Rendering>) {
    candidates.sort_by(|a, b| {
        b.matching_score
            .total_cmp(&a.matching_score)
            .then(b.priority.total_cmp(&a.priority))
    });

    let first_rendering = candidates
        .iter()
        .filter_map(|c| c.rendering.as_ref())
        .find(|r| r.is_image())
        .cloned();

    let urls = candidates
        .into_iter()
        .filter(|c| c.forwarding.url.chars().count() < MAX_FORWARDING_URL_LEN)
        .collect();

    (urls, first_rendering)
}

/// Build the answer for one focus binding.
pub async fn resolve_answer(
    endpoint: &dyn EndpointAccessor,
    references: &dyn ReferenceResolver,
    uri: &str,
) -> Result<Answer, ReferenceError> {
    let label = label_of(endpoint, uri).await;

    let (urls, first_rendering) = match references.resolve(uri).await? {
        Some(candidates) => {
            let (urls, rendering) = rank_references(candidates);
            (Some(urls), rendering)
        }
        None => {
            debug!(uri, "No references for answer");
            (None, None)
        }
    };

    Ok(Answer {
        uri: uri.to_string(),
        label,
        urls,
        first_rendering,
    })
}
