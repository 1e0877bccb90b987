//! HTTP SPARQL endpoint with a response cache and a concurrency limit.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{EndpointError, EndpointResult};
use crate::traits::endpoint::EndpointAccessor;
use crate::types::answer::RawSolution;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<RawSolution>,
}

/// A SPARQL endpoint queried with `GET ?query=...`.
///
/// Successful responses are cached by query text for the lifetime of the
/// accessor. At most `parallel` requests are in flight at once; further
/// queries wait for a permit.
pub struct SparqlEndpoint {
    client: reqwest::Client,
    url: String,
    name: String,
    read_timeout: Duration,
    permits: Semaphore,
    cache: DashMap<String, Arc<Vec<RawSolution>>>,
}

impl SparqlEndpoint {
    pub fn new(url: impl Into<String>, parallel: usize, read_timeout: Duration) -> Self {
        let url = url.into();
        let name = url::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| url.clone());

        Self {
            client: reqwest::Client::new(),
            url,
            name,
            read_timeout,
            permits: Semaphore::new(parallel.max(1)),
            cache: DashMap::new(),
        }
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    fn error_for(&self, sparql: &str, e: reqwest::Error) -> EndpointError {
        if e.is_timeout() {
            EndpointError::Timeout {
                endpoint: self.name.clone(),
                sparql: sparql.to_string(),
            }
        } else if e.is_connect() {
            EndpointError::Persistent {
                endpoint: self.name.clone(),
                sparql: sparql.to_string(),
                message: e.to_string(),
            }
        } else {
            EndpointError::Unexpected {
                endpoint: self.name.clone(),
                sparql: sparql.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl EndpointAccessor for SparqlEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, sparql: &str) -> EndpointResult<Vec<RawSolution>> {
        if let Some(hit) = self.cache.get(sparql) {
            debug!(endpoint = %self.name, "SPARQL cache hit");
            return Ok(Vec::clone(hit.value()));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EndpointError::Unexpected {
                endpoint: self.name.clone(),
                sparql: sparql.to_string(),
                message: e.to_string(),
            })?;

        let response = self
            .client
            .get(&self.url)
            .query(&[("query", sparql)])
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .timeout(self.read_timeout)
            .send()
            .await
            .map_err(|e| self.error_for(sparql, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.error_for(sparql, e))?;

        if !(200..300).contains(&status) {
            let error = classify_status(&self.name, sparql, status, &body);
            warn!(endpoint = %self.name, status, error = %error, "SPARQL request failed");
            return Err(error);
        }

        let solutions = parse_results(&body).map_err(|e| EndpointError::Unexpected {
            endpoint: self.name.clone(),
            sparql: sparql.to_string(),
            message: format!("invalid SPARQL results: {e}"),
        })?;

        self.cache
            .insert(sparql.to_string(), Arc::new(solutions.clone()));
        Ok(solutions)
    }
}

/// Decode `application/sparql-results+json` bindings.
pub fn parse_results(body: &str) -> serde_json::Result<Vec<RawSolution>> {
    let response: SparqlResponse = serde_json::from_str(body)?;
    Ok(response.results.bindings)
}

/// Classify a non-success HTTP status.
///
/// Gateway and server errors are temporary, an endpoint that refuses access
/// or does not exist is persistent, and a rejected query is unexpected.
pub fn classify_status(endpoint: &str, sparql: &str, status: u16, body: &str) -> EndpointError {
    let endpoint = endpoint.to_string();
    let sparql = sparql.to_string();
    let message = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());

    match status {
        500 | 502 | 503 | 504 => EndpointError::Temporary {
            endpoint,
            sparql,
            message,
        },
        401 | 403 | 404 | 410 => EndpointError::Persistent {
            endpoint,
            sparql,
            message,
        },
        _ => EndpointError::Unexpected {
            endpoint,
            sparql,
            message,
        },
    }
}
